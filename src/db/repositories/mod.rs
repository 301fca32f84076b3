pub mod key_value_repository;
