mod registry;
mod request;
mod response;

pub use registry::{EndpointDefinition, RegistryEndpoint};
pub use request::{ContentType, HttpMethod, RequestDefinition, SavedRequest};
pub use response::{ExecutedResponse, ResponseBody};
