//! Shared test utilities for hold-access unit tests.
