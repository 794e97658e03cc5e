pub mod prompt;
pub mod session;

pub use prompt::run_quiz;
pub use session::{QuizError, QuizSession, QuizState};
