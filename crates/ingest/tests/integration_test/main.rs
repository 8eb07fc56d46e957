/// Integration tests for the trip source covering planning, probing against
/// a local mirror and an HTTP server, resource assembly, and batch streaming.

mod helpers;
mod http_source;
mod local_source;
