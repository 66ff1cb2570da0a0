//! Generated gRPC types for the rollcall verification service.

// Include the generated proto code
tonic::include_proto!("rollcall");
