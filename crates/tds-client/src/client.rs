//! Synchronous SQL Server session.
//!
//! [`Session`] is the top-level façade: it owns a [`Framer`] over a caller
//! supplied [`Transport`] and drives the PRELOGIN / LOGIN7 handshake, then
//! SQL batch and RPC execution, entirely on the calling thread. The
//! type-state parameter `S` (see [`crate::state`]) keeps `query`/`execute`
//! off the API until `login()` has actually succeeded.

use std::sync::Arc;

use bytes::{Buf, Bytes};

use tds_protocol::login7::Login7;
use tds_protocol::packet::PacketType;
use tds_protocol::prelogin::{EncryptionLevel, PreLogin};
use tds_protocol::rpc::{RpcParam, RpcRequest};
use tds_protocol::sql_batch::encode_sql_batch_with_transaction;
use tds_protocol::token::{
    ColumnData, ColumnTable, Done, EnvChange, EnvChangeType, EnvChangeValue, ParseOutcome, Token,
    TokenParser,
};
use tds_transport::{Framer, Transport};
use tds_types::decode::decode_value;
use tds_types::SqlValue;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::params::sql_value_to_rpc_param;
use crate::row::{ColMetaData, Column, ColumnSlice, Row};
use crate::state::{Authenticated, Connected, ConnectionState, Disconnected, StateMarker};
use crate::statement_cache::{PreparedStatement, StatementCache};
use crate::to_params::NamedParam;
use crate::transaction::{IsolationLevel, SavePoint, Transaction};

/// The result of running a batch or RPC request: every row produced by
/// every result set, and the total number of rows affected as reported by
/// `DONE`/`DONEPROC`/`DONEINPROC` tokens carrying `DONE_COUNT`.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    rows: Vec<Row>,
    rows_affected: u64,
}

impl QueryResult {
    /// Rows returned by the query, across all result sets in the response,
    /// in the order the server sent them.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume this result, returning the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Sum of row counts reported by `DONE` tokens that carried `DONE_COUNT`.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// An `INFO` or `ERROR` token surfaced by the server, handed to whatever
/// closure was registered with [`Session::on_message`].
///
/// `is_error` mirrors the token type the server actually sent (`ERROR` vs
/// `INFO`); per §7 of the driver's error taxonomy, a class of 14 or higher
/// additionally fails the operation that produced it, which the driver
/// enforces independently of this callback.
#[derive(Debug, Clone)]
pub struct ServerMessage {
    /// SQL Server error/info number (e.g. 18456 for a failed logon).
    pub number: i32,
    /// Error state, server-assigned.
    pub state: u8,
    /// Severity class. `INFO` tokens carry class ≤ 10; `ERROR` tokens carry
    /// class ≥ 11, and class ≥ 14 additionally fails the operation.
    pub class: u8,
    /// Human-readable message text.
    pub message: String,
    /// Name of the server that produced the message.
    pub server: String,
    /// Stored procedure name, empty if the message did not originate in one.
    pub procedure: String,
    /// Line number within the batch or procedure.
    pub line: i32,
    /// Whether this was an `ERROR` token (`true`) or an `INFO` token (`false`).
    pub is_error: bool,
}

type MessageHandler = Box<dyn FnMut(&ServerMessage)>;

/// A synchronous SQL Server connection.
///
/// `T` is the caller's [`Transport`] implementation (typically
/// [`tds_transport::TcpTransport`]); `S` is the current connection state.
pub struct Session<T: Transport, S: ConnectionState> {
    config: Config,
    framer: Framer<T>,
    statement_cache: StatementCache,
    transaction_descriptor: u64,
    server_tds_version: Option<u32>,
    current_database: Option<String>,
    message_handler: Option<MessageHandler>,
    _state: StateMarker<S>,
}

impl<T: Transport> Session<T, Disconnected> {
    /// Connect the transport and move to the `Connected` state.
    ///
    /// This only establishes the byte-level connection; PRELOGIN and
    /// LOGIN7 happen in [`Session::login`].
    pub fn connect(config: Config, mut transport: T) -> Result<Session<T, Connected>> {
        transport.connect(&config.server_name, config.port)?;
        let framer = Framer::with_packet_size(transport, config.packet_size as usize);
        Ok(Session {
            config,
            framer,
            statement_cache: StatementCache::with_default_size(),
            transaction_descriptor: 0,
            server_tds_version: None,
            current_database: None,
            message_handler: None,
            _state: StateMarker::new(),
        })
    }
}

impl<T: Transport, S: ConnectionState> Session<T, S> {
    /// Register a closure to receive every `INFO`/`ERROR` message the server
    /// sends from this point on, replacing any previously registered one.
    ///
    /// The closure is borrowed only for the duration of each message
    /// dispatch, matching the driver façade's `set_info_callback`: callers
    /// who need to retain message data must copy it out.
    pub fn on_message(&mut self, handler: impl FnMut(&ServerMessage) + 'static) {
        self.message_handler = Some(Box::new(handler));
    }
}

impl<T: Transport> Session<T, Connected> {
    /// Run the PRELOGIN and LOGIN7 handshake.
    ///
    /// The client always advertises [`EncryptionLevel::NotSupported`]; a
    /// server that responds with a required encryption level fails the
    /// login rather than negotiating TLS, since no transport in this crate
    /// performs it.
    pub fn login(mut self) -> Result<Session<T, Authenticated>> {
        let prelogin = PreLogin::new()
            .with_version(self.config.tds_version)
            .with_encryption(EncryptionLevel::NotSupported);

        self.framer.begin_message(PacketType::PreLogin);
        self.framer.append(&prelogin.encode());
        self.framer.finalize_and_send()?;

        let response = self.framer.receive_message()?;
        let server_prelogin = PreLogin::decode(response)?;

        if server_prelogin.encryption.is_required() {
            return Err(Error::LoginFailed(
                "server requires encryption; this transport never negotiates TLS".to_string(),
            ));
        }

        let mut login7 = Login7::new()
            .with_tds_version(self.config.tds_version)
            .with_sql_auth(&self.config.user_name, &self.config.password)
            .with_hostname(&self.config.client_host)
            .with_app_name(&self.config.app_name)
            .with_server_name(&self.config.server_name)
            .with_packet_size(u32::from(self.config.packet_size));
        if let Some(database) = &self.config.database {
            login7 = login7.with_database(database);
        }
        login7.library_name = self.config.library_name.clone();
        login7.language = self.config.language.clone().unwrap_or_default();

        self.framer.begin_message(PacketType::Tds7Login);
        self.framer.append(&login7.encode());
        self.framer.finalize_and_send()?;

        let mut session: Session<T, Authenticated> = Session {
            config: self.config,
            framer: self.framer,
            statement_cache: self.statement_cache,
            transaction_descriptor: 0,
            server_tds_version: None,
            current_database: None,
            message_handler: self.message_handler,
            _state: StateMarker::new(),
        };

        let outcome = session.run_token_stream()?;
        if !outcome.login_ack_seen {
            return Err(Error::LoginFailed(
                "server closed the connection without a LOGINACK token".to_string(),
            ));
        }

        Ok(session)
    }
}

impl<T: Transport> Session<T, Authenticated> {
    /// Run a SQL batch with no parameters (packet type `SqlBatch`).
    ///
    /// Useful for DDL, multi-statement scripts, and any text that does not
    /// need typed parameters.
    pub fn batch(&mut self, sql: &str) -> Result<QueryResult> {
        let payload = encode_sql_batch_with_transaction(sql, self.transaction_descriptor);
        self.send_payload(PacketType::SqlBatch, &payload)?;
        Ok(self.run_token_stream()?.result)
    }

    /// Run a parameterized query via `sp_executesql` and return every row.
    pub fn query(&mut self, sql: &str, params: &[NamedParam]) -> Result<Vec<Row>> {
        Ok(self.execute_sql(sql, params)?.into_rows())
    }

    /// Run a parameterized statement via `sp_executesql` and return the
    /// number of rows affected, discarding any rows returned.
    pub fn execute(&mut self, sql: &str, params: &[NamedParam]) -> Result<u64> {
        Ok(self.execute_sql(sql, params)?.rows_affected())
    }

    fn execute_sql(&mut self, sql: &str, params: &[NamedParam]) -> Result<QueryResult> {
        let rpc_params = to_rpc_params(params);
        let request = RpcRequest::execute_sql(sql, rpc_params);
        self.send_rpc(&request)?;
        Ok(self.run_token_stream()?.result)
    }

    /// Prepare `sql` and cache the server-assigned handle for reuse.
    ///
    /// If `sql` is already cached, the cached handle is returned without a
    /// round trip.
    pub fn prepare(&mut self, sql: &str, params: &[NamedParam]) -> Result<i32> {
        if let Some(handle) = self.statement_cache.get(sql) {
            return Ok(handle);
        }

        let rpc_params = to_rpc_params(params);
        let request = RpcRequest::prepare(sql, &rpc_params);
        self.send_rpc(&request)?;
        let outcome = self.run_token_stream()?;

        let handle = outcome.handle.ok_or_else(|| {
            Error::ProtocolError(tds_protocol::ProtocolError::InvalidField {
                field: "sp_prepare handle",
                reason: "no RETURNVALUE token in sp_prepare response".to_string(),
            })
        })?;

        if let Some(evicted) = self
            .statement_cache
            .insert(PreparedStatement::new(handle, sql.to_string()))
        {
            self.unprepare(evicted.handle())?;
        }

        Ok(handle)
    }

    /// Execute a previously [`Session::prepare`]d statement by handle.
    pub fn execute_prepared(&mut self, handle: i32, params: &[NamedParam]) -> Result<Vec<Row>> {
        let request = RpcRequest::execute(handle, to_rpc_params(params));
        self.send_rpc(&request)?;
        Ok(self.run_token_stream()?.result.into_rows())
    }

    /// Release a server-side prepared statement handle via `sp_unprepare`.
    pub fn unprepare(&mut self, handle: i32) -> Result<()> {
        let request = RpcRequest::unprepare(handle);
        self.send_rpc(&request)?;
        self.run_token_stream()?;
        Ok(())
    }

    /// Begin an explicit transaction at the given isolation level.
    ///
    /// The transaction descriptor captured from the server's `BeginTransaction`
    /// `ENVCHANGE` is threaded into every subsequent request's `ALL_HEADERS`
    /// until the transaction is committed or rolled back.
    pub fn begin_transaction(&mut self, level: IsolationLevel) -> Result<Transaction<'_>> {
        self.batch(level.as_sql())?;
        self.batch("BEGIN TRANSACTION")?;
        Ok(Transaction::with_isolation_level(level))
    }

    /// Commit the current transaction.
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.batch("COMMIT TRANSACTION")?;
        Ok(())
    }

    /// Roll back the current transaction in its entirety.
    pub fn rollback_transaction(&mut self) -> Result<()> {
        self.batch("ROLLBACK TRANSACTION")?;
        Ok(())
    }

    /// Mark a savepoint within the current transaction.
    pub fn save_point(&mut self, name: &str) -> Result<SavePoint> {
        validate_identifier(name)?;
        self.batch(&format!("SAVE TRANSACTION {name}"))?;
        Ok(SavePoint::new(name.to_string()))
    }

    /// Roll back to a previously marked savepoint.
    pub fn rollback_to(&mut self, save_point: &SavePoint) -> Result<()> {
        self.batch(&format!("ROLLBACK TRANSACTION {}", save_point.name()))?;
        Ok(())
    }

    /// Current database, if an `ENVCHANGE` has reported one.
    #[must_use]
    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    /// Server TDS version reported in the LOGINACK token.
    #[must_use]
    pub fn server_tds_version(&self) -> Option<u32> {
        self.server_tds_version
    }

    /// The configuration this session was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Disconnect the underlying transport.
    pub fn disconnect(mut self) -> Result<()> {
        self.framer.transport_mut().disconnect()?;
        Ok(())
    }

    fn send_payload(&mut self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        self.framer.begin_message(packet_type);
        self.framer.append(payload);
        self.framer.finalize_and_send()?;
        Ok(())
    }

    fn send_rpc(&mut self, request: &RpcRequest) -> Result<()> {
        let payload = request.encode_with_transaction(self.transaction_descriptor);
        self.send_payload(PacketType::Rpc, &payload)
    }
}

/// Severity class at and above which an `ERROR` token fails the operation
/// that produced it, per §7 of the driver's error taxonomy.
const FATAL_ERROR_CLASS: u8 = 14;

fn to_rpc_params(params: &[NamedParam]) -> Vec<RpcParam> {
    params
        .iter()
        .map(|p| sql_value_to_rpc_param(&p.name, &p.value))
        .collect()
}

/// Outcome of draining one logical token stream: accumulated rows/affected
/// counts, plus the bits other callers (`login`, `prepare`) need from the
/// same stream without re-parsing it.
struct StreamOutcome {
    result: QueryResult,
    login_ack_seen: bool,
    handle: Option<i32>,
}

impl<T: Transport, S: ConnectionState> Session<T, S> {
    /// Drain one logical response: read messages until a final `DONE` (the
    /// one without `DONE_MORE`) and decode every token along the way.
    fn run_token_stream(&mut self) -> Result<StreamOutcome> {
        let first = self.framer.receive_message()?;
        let mut parser = TokenParser::new(first);
        let mut columns = ColumnTable::default();
        let mut metadata = Arc::new(ColMetaData::new(Vec::new()));
        let mut rows = Vec::new();
        let mut rows_affected: u64 = 0;
        let mut login_ack_seen = false;
        let mut handle = None;
        let mut pending_error: Option<Error> = None;

        loop {
            match parser.next_token(&columns)? {
                ParseOutcome::Token(token) => match token {
                    Token::ColMetaData(cm) => {
                        let cols: Vec<Column> = cm
                            .columns
                            .iter()
                            .enumerate()
                            .map(|(i, c)| column_from_wire(i, c))
                            .collect();
                        columns = ColumnTable::from(&cm);
                        metadata = Arc::new(ColMetaData::new(cols));
                    }
                    Token::Row(raw) => {
                        rows.push(build_row(raw.data, &columns, &metadata, None)?);
                    }
                    Token::NbcRow(nbc) => {
                        rows.push(build_row(
                            nbc.data,
                            &columns,
                            &metadata,
                            Some(&nbc.null_bitmap),
                        )?);
                    }
                    Token::Done(Done {
                        status, row_count, ..
                    }) => {
                        if status.count {
                            rows_affected += row_count;
                        }
                        if !status.more {
                            break;
                        }
                    }
                    Token::DoneProc(done) => {
                        if done.status.count {
                            rows_affected += done.row_count;
                        }
                        if !done.status.more {
                            break;
                        }
                    }
                    Token::DoneInProc(done) => {
                        if done.status.count {
                            rows_affected += done.row_count;
                        }
                        if !done.status.more {
                            break;
                        }
                    }
                    Token::EnvChange(env) => self.apply_env_change(env),
                    Token::Error(e) => {
                        tracing::warn!(
                            number = e.number,
                            class = e.class,
                            message = %e.message,
                            "server error message"
                        );
                        if let Some(handler) = &mut self.message_handler {
                            handler(&ServerMessage {
                                number: e.number,
                                state: e.state,
                                class: e.class,
                                message: e.message.clone(),
                                server: e.server.clone(),
                                procedure: e.procedure.clone(),
                                line: e.line,
                                is_error: true,
                            });
                        }
                        // Only class >= 14 ("fatal" per the TDS error
                        // severity scale) fails the operation; lower
                        // classes are delivered to the message handler but
                        // do not abort the command (§7 error taxonomy).
                        if e.class >= FATAL_ERROR_CLASS {
                            pending_error.get_or_insert(Error::Server {
                                number: e.number,
                                class: e.class,
                                state: e.state,
                                message: e.message,
                                server: Some(e.server),
                                procedure: Some(e.procedure),
                                line: e.line.max(0) as u32,
                            });
                        }
                    }
                    Token::Info(info) => {
                        tracing::debug!(
                            number = info.number,
                            message = %info.message,
                            "server info message"
                        );
                        if let Some(handler) = &mut self.message_handler {
                            handler(&ServerMessage {
                                number: info.number,
                                state: info.state,
                                class: info.class,
                                message: info.message,
                                server: info.server,
                                procedure: info.procedure,
                                line: info.line,
                                is_error: false,
                            });
                        }
                    }
                    Token::LoginAck(ack) => {
                        login_ack_seen = true;
                        self.server_tds_version = Some(ack.tds_version);
                    }
                    Token::ReturnStatus(_) => {}
                    Token::ReturnValue(rv) => {
                        // INTN arrives as a 1-byte length prefix (0x04) followed by the
                        // four value bytes; `rv.value` retains that prefix verbatim.
                        if handle.is_none() && rv.value.len() >= 5 {
                            handle = Some(i32::from_le_bytes([
                                rv.value[1],
                                rv.value[2],
                                rv.value[3],
                                rv.value[4],
                            ]));
                        }
                    }
                    Token::Order(_) => {}
                },
                ParseOutcome::NeedMoreData => {
                    let more = self.framer.receive_message()?;
                    parser.extend(&more);
                }
                ParseOutcome::EndOfStream => break,
            }
        }

        if let Some(err) = pending_error {
            return Err(err);
        }

        Ok(StreamOutcome {
            result: QueryResult {
                rows,
                rows_affected,
            },
            login_ack_seen,
            handle,
        })
    }

    fn apply_env_change(&mut self, env: EnvChange) {
        match env.env_type {
            EnvChangeType::Database => {
                if let EnvChangeValue::String(db) = env.new_value {
                    self.current_database = Some(db);
                }
            }
            EnvChangeType::PacketSize => {
                if let EnvChangeValue::String(size) = env.new_value {
                    if let Ok(size) = size.parse::<usize>() {
                        self.framer.set_packet_size(size);
                    }
                }
            }
            EnvChangeType::BeginTransaction | EnvChangeType::EnlistDtcTransaction => {
                if let EnvChangeValue::Binary(bytes) = env.new_value {
                    self.transaction_descriptor = transaction_descriptor_from_bytes(&bytes);
                }
            }
            EnvChangeType::CommitTransaction | EnvChangeType::RollbackTransaction => {
                self.transaction_descriptor = 0;
            }
            EnvChangeType::Routing => {
                if let EnvChangeValue::Routing { host, port } = env.new_value {
                    tracing::warn!(host = %host, port, "server requested routing; not followed");
                }
            }
            _ => {}
        }
    }
}

fn transaction_descriptor_from_bytes(bytes: &Bytes) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_le_bytes(buf)
}

fn validate_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '#' || c == '@');
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid savepoint name: {name}")))
    }
}

fn column_from_wire(index: usize, data: &ColumnData) -> Column {
    let nullable = data.flags & 0x0001 != 0;
    let mut column = Column::new(data.name.clone(), index, data.col_type).with_nullable(nullable);
    if let Some(max_length) = data.type_info.max_length {
        column = column.with_max_length(max_length);
    }
    if let (Some(precision), Some(scale)) = (data.type_info.precision, data.type_info.scale) {
        column = column.with_precision_scale(precision, scale);
    }
    column = column.with_plp(data.type_info.is_plp);
    if let Some(collation) = data.type_info.collation {
        column = column.with_collation(collation);
    }
    column
}

/// Walk a row's value buffer once, decoding each column with
/// [`decode_value`] to discover its byte range, and assemble a zero-copy
/// [`Row`] over the resulting slices.
///
/// `null_bitmap`, when present, is the NBCROW bitmap: bits set there mean
/// the column contributes no bytes to `data` at all, so it is checked
/// before attempting to decode anything for that column.
fn build_row(
    data: Bytes,
    columns: &ColumnTable,
    metadata: &Arc<ColMetaData>,
    null_bitmap: Option<&[u8]>,
) -> Result<Row> {
    let mut slices = Vec::with_capacity(columns.columns.len());
    let mut cursor = data.clone();

    for (index, column) in columns.columns.iter().enumerate() {
        if let Some(bitmap) = null_bitmap {
            let byte = index / 8;
            let bit = index % 8;
            if bitmap.get(byte).is_some_and(|b| (b & (1 << bit)) != 0) {
                slices.push(ColumnSlice::null());
                continue;
            }
        }

        let before = cursor.remaining();
        let offset = data.len() - before;
        let type_info = wire_type_to_decode_type_info(column);
        let value = decode_value(&mut cursor, &type_info)?;
        let consumed = before - cursor.remaining();
        slices.push(ColumnSlice::new(
            offset as u32,
            consumed as u32,
            matches!(value, SqlValue::Null),
        ));
    }

    Ok(Row::new(Arc::new(data), slices.into(), metadata.clone()))
}

fn wire_type_to_decode_type_info(column: &ColumnData) -> tds_types::decode::TypeInfo {
    tds_types::decode::TypeInfo {
        type_id: column.col_type,
        length: column.type_info.max_length,
        scale: column.type_info.scale,
        precision: column.type_info.precision,
        collation: column
            .type_info
            .collation
            .map(|c| tds_types::decode::Collation {
                lcid: c.lcid,
                flags: c.sort_id,
            }),
        is_plp: column.type_info.is_plp,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tds_protocol::token::ColMetaData as WireColMetaData;
    use tds_protocol::token::TypeInfo as WireTypeInfo;

    #[test]
    fn transaction_descriptor_from_short_bytes_zero_pads() {
        let bytes = Bytes::from_static(&[0x01, 0x02]);
        let descriptor = transaction_descriptor_from_bytes(&bytes);
        assert_eq!(descriptor, 0x0201);
    }

    #[test]
    fn validate_identifier_rejects_punctuation() {
        assert!(validate_identifier("ok_name1").is_ok());
        assert!(validate_identifier("bad;drop").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn build_row_decodes_int_column() {
        let column = ColumnData {
            name: "id".to_string(),
            user_type: 0,
            flags: 0,
            col_type: 0x38, // INT4TYPE
            type_info: WireTypeInfo::default(),
        };
        let columns = ColumnTable::from(&WireColMetaData {
            columns: vec![column],
        });
        let metadata = Arc::new(ColMetaData::new(vec![Column::new("id", 0, 0x38)]));

        let data = Bytes::from_static(&42i32.to_le_bytes());
        let row = build_row(data, &columns, &metadata, None).unwrap();

        assert_eq!(row.get::<i32>(0).unwrap(), 42);
    }

    #[test]
    fn build_row_skips_nbcrow_null_column() {
        let columns = ColumnTable::from(&WireColMetaData {
            columns: vec![
                ColumnData {
                    name: "a".to_string(),
                    user_type: 0,
                    flags: 0,
                    col_type: 0x38,
                    type_info: WireTypeInfo::default(),
                },
                ColumnData {
                    name: "b".to_string(),
                    user_type: 0,
                    flags: 0,
                    col_type: 0x38,
                    type_info: WireTypeInfo::default(),
                },
            ],
        });
        let metadata = Arc::new(ColMetaData::new(vec![
            Column::new("a", 0, 0x38),
            Column::new("b", 1, 0x38),
        ]));

        // Bit 0 set: column "a" is NULL and contributes no bytes.
        let data = Bytes::from_static(&7i32.to_le_bytes());
        let row = build_row(data, &columns, &metadata, Some(&[0b0000_0001])).unwrap();

        assert!(row.is_null(0));
        assert_eq!(row.get::<i32>(1).unwrap(), 7);
    }
}
