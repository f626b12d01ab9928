//! Player script retrieval, code extraction, sandboxed execution and URL resolution

pub mod cipher;
pub mod extractor;
pub mod fetch;
pub mod resolver;
pub mod sandbox;

pub use cipher::*;
pub use extractor::{extract, extract_functions, ExtractedFunctions, FragmentList};
pub use fetch::{FetchOptions, HttpFetcherConfig, HttpPlayerFetcher, PlayerFetcher};
pub use resolver::{resolve_formats, resolve_one, BatchPrograms};
pub use sandbox::ExecutableProgram;
