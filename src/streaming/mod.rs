//! Range-request video streaming.
//!
//! Every `/video` response is a single `206 Partial Content` window of at
//! most `streaming.chunk_size` bytes, starting where the client's `Range`
//! header asks. The player keeps issuing range requests as it plays.
//!
//! - [`range`] turns a `Range` header and a file size into a [`ByteRange`]
//! - [`direct`] measures the file and streams the window in bounded reads

pub mod direct;
pub mod range;

pub use direct::{
    file_size, open_window, plain_error_response, serve_range, window_stream, READ_CAPACITY,
};
pub use range::{parse_range_header, resolve_range, ByteRange, CHUNK_SIZE};
