//! End-to-end tests of the server and client live under `tests/`.
