use redb::TableDefinition;

/// File records: content hash -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Peer registrations: (content hash, peer address) -> PeerRegistration (msgpack)
pub const PEERS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("peers");
