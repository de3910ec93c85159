pub mod cache;
pub mod config;
pub mod entrypoint;
pub mod etag;
pub mod exception;
pub mod manifest;
pub mod negotiate;
pub mod param;
pub mod precondition;
pub mod request;
pub mod response;
pub mod server;
pub mod storage;
pub mod util;

pub use cache::VariantCache;
pub use config::Config;
pub use entrypoint::{Element, ResolvedEntrypoint};
pub use etag::{EntityTag, TagCondition};
pub use exception::{Exception, ManifestError};
pub use manifest::{Entrypoints, Manifest, ManifestReader, ManifestSource};
pub use negotiate::{choose_variant, EncodingPreference, NegotiationOutcome};
pub use param::{HttpRequestMethod, HttpVersion};
pub use precondition::{Decision, PreconditionState, Preconditions};
pub use request::Request;
pub use response::{BodyPlan, Response};
pub use server::{AssetServer, AssetServerOptions, Outcome};
pub use storage::{AssetBody, AssetLocation, AssetStorage, MemoryStorage, PhysicalStorage};
pub use util::{call_entrypoint, HtmlBuilder};
