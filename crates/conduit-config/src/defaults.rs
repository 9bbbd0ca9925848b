use crate::address::ListenAddress;

/// Loopback interface the bridge binds to unless configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port for the command bridge.
pub const DEFAULT_PORT: u16 = 55557;

/// Owned default host used where allocation is required (e.g. serde).
pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// Default port, exposed as a function for serde.
pub fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Computes the default listen address for the bridge.
pub fn default_listen_address() -> ListenAddress {
    ListenAddress::new(DEFAULT_HOST, DEFAULT_PORT)
}
