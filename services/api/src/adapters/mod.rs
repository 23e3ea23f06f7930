pub mod analysis_llm;
pub mod db;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use db::DbAdapter;
