pub mod twiml;
pub use twiml::{TWIML_CONTENT_TYPE, TwimlResponse, encode_component, escape_xml};
