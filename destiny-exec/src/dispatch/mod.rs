pub(crate) mod call;
pub mod http;
pub mod request;
pub mod response;

pub use http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use request::{build_request, encode_params, outbound_headers, substitute_rest_ids, RestIdError};
