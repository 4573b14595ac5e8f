mod connection_error;
mod help;
