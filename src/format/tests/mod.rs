//! Tests for label encoding and label directories.
