//! Cross-module pipeline tests with scripted gateway implementations.
