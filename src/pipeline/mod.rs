//! Pipeline stages for PDF-to-rules extraction.
//!
//! Each submodule implements one transformation step and is tested on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ reader ──▶ paragraphs ──▶ extract ──▶ assemble ──▶ write
//! (URL/path) (pdfium)   (split)       (LLM)      (order/id)   (JSON)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`reader`]: per-page text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`paragraphs`]: split page text on blank lines
//! 4. [`extract`]: one model call per paragraph with retry and fallback;
//!    the only stage with network I/O
//! 5. [`assemble`]: ids, fixed metadata and (page, index) ordering
//! 6. [`write`]: atomic JSON write

pub mod assemble;
pub mod extract;
pub mod input;
pub mod paragraphs;
pub mod reader;
pub mod write;
