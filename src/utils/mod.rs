pub mod http;

pub use http::{header_str, merge_payload, parse_body, parse_query, read_body_with_limit, MAX_BODY_SIZE};
