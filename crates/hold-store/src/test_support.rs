//! Shared test utilities for hold-store unit tests.
