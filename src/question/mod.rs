//! Question domain: prompts in, validated questions out
//!
//! # Example
//!
//! ```ignore
//! use quiz_mux::question::{normalize, Difficulty, PromptBuilder, TemplatePromptBuilder};
//!
//! let prompt = TemplatePromptBuilder::default().build("Capitals", &Difficulty::Easy, &[])?;
//! // ... send prompt.user to a backend ...
//! let question = normalize(&raw_text, "Capitals", &Difficulty::Easy)?;
//! assert!(question.correct_answer().is_correct);
//! ```

mod normalizer;
mod output_parser;
mod prompt;
mod types;

pub use normalizer::{MIN_ANSWERS, NormalizeError, normalize, normalize_with_rng};
pub use output_parser::extract_json_object;
pub use prompt::{Prompt, PromptBuilder, PromptError, TemplatePromptBuilder};
pub use types::{Answer, Difficulty, Question};
