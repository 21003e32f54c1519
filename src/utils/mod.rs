pub mod decompression;
pub mod format_detection;
pub mod http_client;
pub mod url;

pub use decompression::{CompressionFormat, DecompressionService};
pub use format_detection::{DetectedFormat, detect};
pub use http_client::{HttpFetcher, SourceFetcher};
pub use url::UrlUtils;
