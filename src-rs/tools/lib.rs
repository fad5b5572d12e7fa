pub mod allowlist;
pub mod dispatch;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod types;

pub use allowlist::AllowedToolSet;
pub use dispatch::Dispatcher;
pub use registry::ToolCatalog;
pub use resolver::resolve_arguments;
pub use schema::infer_schema;
pub use types::{
    optional_str, required_str, ParamDecl, ParamSpec, ParameterSchema, RawArguments, ResolvedArguments,
    ToolCallRequest, ToolCallResult, ToolDescriptor, ToolEntry, ToolHandler, ToolOutput, ToolSchema,
    TypeTag,
};
