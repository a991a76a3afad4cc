pub mod auth_error;
