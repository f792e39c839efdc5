//! Function platform: handler factories, document triggers and module composition.
//!
//! Business code supplies a `Handler` plus a validator and an assembler; the
//! factories here own the request pipeline (method/auth gate, validate,
//! assemble, invoke, shape the response) and error mapping at the boundary.

pub mod callable;
pub mod handler;
pub mod http;
pub mod increment_id;
pub mod module;
pub mod runner;
pub mod trigger;

pub use callable::{
    CallableAssembler, CallableError, CallableFunction, CallableHandler, CallableRequest, CallableValidator,
    FunctionsErrorCode,
};
pub use handler::Handler;
pub use http::{HttpAssembler, HttpFunction, HttpHandler, HttpMethod, HttpRequest, HttpResponse, HttpValidator};
pub use increment_id::{
    COUNTER_FIELD, FailurePolicy, INCREMENT_ID_FIELD, SetIncrementIdHandler, set_increment_id_trigger,
};
pub use module::{DuplicateExport, Endpoint, Module, ModuleExports};
pub use runner::{RunnerHandle, TriggerRunner};
pub use trigger::{DocumentTrigger, TriggerEvent, TriggerHandler};
