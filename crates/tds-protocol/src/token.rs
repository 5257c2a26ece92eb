//! TDS token stream definitions.
//!
//! Tokens are the fundamental units of TDS response data. The server sends
//! a stream of tokens that describe metadata, rows, errors, and other information.
//!
//! ## Token Structure
//!
//! Each token begins with a 1-byte token type identifier, followed by
//! token-specific data. Some tokens have fixed lengths, while others
//! have length prefixes. Decoding `ROW`/`NBCROW`/`RETURNVALUE` additionally
//! requires the `COLMETADATA` that preceded them in the same logical
//! message, so [`TokenParser::next_token`] takes a [`ColumnTable`] built
//! from the most recent `COLMETADATA` token.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tds_protocol::token::{ColumnTable, ParseOutcome, Token, TokenParser};
//! use bytes::Bytes;
//!
//! let data: Bytes = /* received from server */;
//! let mut parser = TokenParser::new(data);
//! let mut columns = ColumnTable::default();
//!
//! loop {
//!     match parser.next_token(&columns)? {
//!         ParseOutcome::Token(Token::ColMetaData(meta)) => {
//!             columns = ColumnTable::from(&meta);
//!         }
//!         ParseOutcome::Token(Token::Done(done)) => println!("rows affected: {}", done.row_count),
//!         ParseOutcome::Token(_) => {}
//!         ParseOutcome::NeedMoreData => break, // wait for the next packet
//!         ParseOutcome::EndOfStream => break,
//!     }
//! }
//! ```

use bytes::{Buf, BufMut, Bytes};

use crate::codec::{read_b_varchar, read_us_varchar};
use crate::error::ProtocolError;
use crate::types::TypeId;

/// Token type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    /// Column metadata (COLMETADATA).
    ColMetaData = 0x81,
    /// Error message (ERROR).
    Error = 0xAA,
    /// Informational message (INFO).
    Info = 0xAB,
    /// Login acknowledgment (LOGINACK).
    LoginAck = 0xAD,
    /// Row data (ROW).
    Row = 0xD1,
    /// Null bitmap compressed row (NBCROW).
    NbcRow = 0xD2,
    /// Environment change (ENVCHANGE).
    EnvChange = 0xE3,
    /// Done (DONE).
    Done = 0xFD,
    /// Done in procedure (DONEINPROC).
    DoneInProc = 0xFF,
    /// Done procedure (DONEPROC).
    DoneProc = 0xFE,
    /// Return status (RETURNSTATUS).
    ReturnStatus = 0x79,
    /// Return value (RETURNVALUE).
    ReturnValue = 0xAC,
    /// Order (ORDER).
    Order = 0xA9,
}

impl TokenType {
    /// Create a token type from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x81 => Some(Self::ColMetaData),
            0xAA => Some(Self::Error),
            0xAB => Some(Self::Info),
            0xAD => Some(Self::LoginAck),
            0xD1 => Some(Self::Row),
            0xD2 => Some(Self::NbcRow),
            0xE3 => Some(Self::EnvChange),
            0xFD => Some(Self::Done),
            0xFF => Some(Self::DoneInProc),
            0xFE => Some(Self::DoneProc),
            0x79 => Some(Self::ReturnStatus),
            0xAC => Some(Self::ReturnValue),
            0xA9 => Some(Self::Order),
            _ => None,
        }
    }
}

/// Parsed TDS token.
///
/// This enum represents all possible tokens that can be received from SQL Server
/// for the batch and RPC flows this crate supports. Each variant contains the
/// parsed token data.
#[derive(Debug, Clone)]
pub enum Token {
    /// Column metadata describing result set structure.
    ColMetaData(ColMetaData),
    /// Row data.
    Row(RawRow),
    /// Null bitmap compressed row.
    NbcRow(NbcRow),
    /// Completion of a SQL statement.
    Done(Done),
    /// Completion of a stored procedure.
    DoneProc(DoneProc),
    /// Completion within a stored procedure.
    DoneInProc(DoneInProc),
    /// Return status from stored procedure.
    ReturnStatus(i32),
    /// Return value from stored procedure (output parameter or RETURN_VALUE).
    ReturnValue(ReturnValue),
    /// Error message from server.
    Error(ServerError),
    /// Informational message from server.
    Info(ServerInfo),
    /// Login acknowledgment.
    LoginAck(LoginAck),
    /// Environment change notification.
    EnvChange(EnvChange),
    /// Column ordering information.
    Order(Order),
}

/// Outcome of attempting to parse the next token.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// A token was fully decoded.
    Token(Token),
    /// The buffer does not yet contain a complete token; no bytes were
    /// consumed. Feed more bytes (the next packet's payload) and retry.
    NeedMoreData,
    /// The buffer has been fully consumed.
    EndOfStream,
}

/// Column metadata token.
#[derive(Debug, Clone, Default)]
pub struct ColMetaData {
    /// Column definitions, in wire order.
    pub columns: Vec<ColumnData>,
}

/// A materialized view of the columns described by the most recent
/// `COLMETADATA` token, passed back into [`TokenParser::next_token`] so it
/// can decode `ROW`/`NBCROW`/`RETURNVALUE` tokens that follow.
#[derive(Debug, Clone, Default)]
pub struct ColumnTable {
    /// Column definitions, in wire order.
    pub columns: Vec<ColumnData>,
}

impl From<&ColMetaData> for ColumnTable {
    fn from(meta: &ColMetaData) -> Self {
        Self {
            columns: meta.columns.clone(),
        }
    }
}

impl From<ColMetaData> for ColumnTable {
    fn from(meta: ColMetaData) -> Self {
        Self {
            columns: meta.columns,
        }
    }
}

/// Column definition within metadata.
#[derive(Debug, Clone)]
pub struct ColumnData {
    /// Column name.
    pub name: String,
    /// `UserType` field from the wire (4 bytes on TDS 7.2+).
    pub user_type: u32,
    /// Column flags (see `MS-TDS` `COLMETADATA` flags bitfield).
    pub flags: u16,
    /// Column data type.
    pub col_type: u8,
    /// Type-specific metadata.
    pub type_info: TypeInfo,
}

/// Type-specific metadata decoded from a column's `TYPE_INFO` block.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    /// Declared maximum length for variable-length types (byte length,
    /// or `0xFFFF` for `MAX`-size/PLP types).
    pub max_length: Option<u32>,
    /// Precision for numeric types.
    pub precision: Option<u8>,
    /// Scale for numeric and fractional-second date/time types.
    pub scale: Option<u8>,
    /// Collation for character types.
    pub collation: Option<Collation>,
    /// Whether values of this type are transmitted with PLP (chunked)
    /// framing rather than a simple length prefix.
    pub is_plp: bool,
}

/// SQL Server collation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collation {
    /// Locale ID plus collation flags, packed as on the wire.
    pub lcid: u32,
    /// Sort ID.
    pub sort_id: u8,
}

impl Collation {
    /// Check if this collation uses UTF-8 encoding (SQL Server 2019+).
    ///
    /// UTF-8 collations have bit 27 (0x0800_0000) set in the LCID.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        (self.lcid & 0x0800_0000) != 0
    }

    /// Get the `encoding_rs` encoding for this collation's LCID.
    #[cfg(feature = "encoding")]
    #[must_use]
    pub fn encoding(&self) -> Option<&'static encoding_rs::Encoding> {
        collation_encoding::encoding_for_lcid(self.lcid)
    }

    /// Name of the encoding this collation decodes to, or `"unknown"` if
    /// the LCID maps to no known code page.
    #[cfg(feature = "encoding")]
    #[must_use]
    pub fn encoding_name(&self) -> &'static str {
        self.encoding().map_or("unknown", |e| e.name())
    }
}

#[cfg(feature = "encoding")]
mod collation_encoding {
    const UTF8_COLLATION_FLAG: u32 = 0x0800_0000;

    pub(super) fn encoding_for_lcid(lcid: u32) -> Option<&'static encoding_rs::Encoding> {
        if (lcid & UTF8_COLLATION_FLAG) != 0 {
            return Some(encoding_rs::UTF_8);
        }

        let code_page = code_page_for_lcid(lcid)?;
        match code_page {
            874 => Some(encoding_rs::WINDOWS_874),
            932 => Some(encoding_rs::SHIFT_JIS),
            936 => Some(encoding_rs::GB18030),
            949 => Some(encoding_rs::EUC_KR),
            950 => Some(encoding_rs::BIG5),
            1250 => Some(encoding_rs::WINDOWS_1250),
            1251 => Some(encoding_rs::WINDOWS_1251),
            1252 => Some(encoding_rs::WINDOWS_1252),
            1253 => Some(encoding_rs::WINDOWS_1253),
            1254 => Some(encoding_rs::WINDOWS_1254),
            1255 => Some(encoding_rs::WINDOWS_1255),
            1256 => Some(encoding_rs::WINDOWS_1256),
            1257 => Some(encoding_rs::WINDOWS_1257),
            1258 => Some(encoding_rs::WINDOWS_1258),
            _ => None,
        }
    }

    /// Windows code page for an LCID's primary language ID (lower 10 bits).
    fn code_page_for_lcid(lcid: u32) -> Option<u16> {
        const PRIMARY_LANGUAGE_MASK: u32 = 0x3FF;
        let primary_lang = lcid & PRIMARY_LANGUAGE_MASK;

        match primary_lang {
            0x0411 => Some(932),
            0x0804 | 0x1004 => Some(936),
            0x0404 | 0x0C04 | 0x1404 => Some(950),
            0x0412 => Some(949),
            0x041E => Some(874),
            0x042A => Some(1258),

            0x0405 | 0x0415 | 0x040E | 0x041A | 0x081A | 0x141A | 0x101A | 0x041B | 0x0424
            | 0x0418 | 0x041C => Some(1250),

            0x0419 | 0x0422 | 0x0423 | 0x0402 | 0x042F | 0x0C1A | 0x201A | 0x0440 | 0x0843
            | 0x0444 | 0x0450 | 0x0485 => Some(1251),

            0x0408 => Some(1253),
            0x041F | 0x042C => Some(1254),
            0x040D => Some(1255),

            0x0401 | 0x0801 | 0x0C01 | 0x1001 | 0x1401 | 0x1801 | 0x1C01 | 0x2001 | 0x2401
            | 0x2801 | 0x2C01 | 0x3001 | 0x3401 | 0x3801 | 0x3C01 | 0x4001 | 0x0429 | 0x0420
            | 0x048C | 0x0463 => Some(1256),

            0x0425..=0x0427 => Some(1257),

            _ => Some(1252),
        }
    }
}

impl TypeInfo {
    /// Decode the `TYPE_INFO` block that follows a column's type byte in
    /// `COLMETADATA`, or the equivalent block in `RETURNVALUE`.
    pub fn decode(col_type: u8, src: &mut impl Buf) -> Result<Self, ProtocolError> {
        let type_id = TypeId::from_u8(col_type);

        // Fixed-length types carry no TYPE_INFO beyond the type byte.
        if let Some(id) = type_id {
            if id.is_fixed_length() {
                return Ok(Self::default());
            }
        }

        match col_type {
            // BYTELEN-prefixed nullable wrappers: one length byte precedes
            // every value; NUMERIC/DECIMAL also carry precision+scale here.
            0x26 | 0x68 | 0x6D | 0x6E | 0x6F | 0x24 | 0x28 => {
                if src.remaining() < 1 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u8() as u32;
                Ok(Self {
                    max_length: Some(max_length),
                    ..Self::default()
                })
            }
            // TIME / DATETIME2 / DATETIMEOFFSET carry a scale byte instead
            // of a length byte; the wire length of each value depends on it.
            0x29 | 0x2A | 0x2B => {
                if src.remaining() < 1 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let scale = src.get_u8();
                Ok(Self {
                    scale: Some(scale),
                    ..Self::default()
                })
            }
            // Legacy and modern DECIMAL/NUMERIC: length, precision, scale.
            0x37 | 0x3F | 0x6A | 0x6C => {
                if src.remaining() < 3 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u8() as u32;
                let precision = src.get_u8();
                let scale = src.get_u8();
                Ok(Self {
                    max_length: Some(max_length),
                    precision: Some(precision),
                    scale: Some(scale),
                    ..Self::default()
                })
            }
            // USHORTLEN-prefixed binary types: no collation.
            0xA5 | 0xAD => {
                if src.remaining() < 2 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u16_le() as u32;
                Ok(Self {
                    max_length: Some(max_length),
                    is_plp: max_length == 0xFFFF,
                    ..Self::default()
                })
            }
            // USHORTLEN-prefixed character types: length then collation.
            0xA7 | 0xAF | 0xE7 | 0xEF => {
                if src.remaining() < 2 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u16_le() as u32;
                let collation = Self::decode_collation(src)?;
                Ok(Self {
                    max_length: Some(max_length),
                    collation: Some(collation),
                    is_plp: max_length == 0xFFFF,
                    ..Self::default()
                })
            }
            // Legacy LONGLEN text/image types: 4-byte max length, then
            // collation for the character variants.
            0x22 => {
                if src.remaining() < 4 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u32_le();
                Ok(Self {
                    max_length: Some(max_length),
                    is_plp: true,
                    ..Self::default()
                })
            }
            0x23 | 0x63 => {
                if src.remaining() < 4 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let max_length = src.get_u32_le();
                let collation = Self::decode_collation(src)?;
                Ok(Self {
                    max_length: Some(max_length),
                    collation: Some(collation),
                    is_plp: true,
                    ..Self::default()
                })
            }
            // XML carries an optional schema descriptor flag byte, then
            // (if set) a schema reference; values themselves are always PLP.
            0xF1 => {
                if src.remaining() < 1 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                let has_schema = src.get_u8();
                if has_schema != 0 {
                    let db = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
                    let owner = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
                    let _collection = read_us_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
                    let _ = (db, owner);
                }
                Ok(Self {
                    is_plp: true,
                    ..Self::default()
                })
            }
            other => Err(ProtocolError::InvalidField {
                field: "column type",
                reason: alloc_format!("unsupported TYPE_INFO for type 0x{other:02X}"),
            }),
        }
    }

    fn decode_collation(src: &mut impl Buf) -> Result<Collation, ProtocolError> {
        if src.remaining() < 5 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let lcid = src.get_u32_le();
        let sort_id = src.get_u8();
        Ok(Collation { lcid, sort_id })
    }

    /// Number of bytes occupied by the length prefix for one value of this
    /// type (`0` for fixed-length and PLP types, which are handled
    /// separately).
    fn prefix_width(&self, col_type: u8) -> usize {
        match col_type {
            0x26 | 0x68 | 0x6D | 0x6E | 0x6F | 0x24 | 0x28 | 0x29 | 0x2A | 0x2B | 0x37 | 0x3F
            | 0x6A | 0x6C => 1,
            0xA5 | 0xAD | 0xA7 | 0xAF | 0xE7 | 0xEF if !self.is_plp => 2,
            _ => 0,
        }
    }
}

/// Read exactly one column value out of `src`, honoring fixed-length,
/// BYTELEN/USHORTLEN-prefixed, and PLP framing as declared by `type_info`.
/// The returned `Bytes` includes any length prefix, matching what earlier
/// revisions of this parser stored verbatim.
fn read_value(
    src: &mut impl Buf,
    col_type: u8,
    type_info: &TypeInfo,
) -> Result<Bytes, ProtocolError> {
    if type_info.is_plp {
        return read_plp(src);
    }

    if let Some(id) = TypeId::from_u8(col_type) {
        if id.is_fixed_length() {
            let size = id.fixed_size().unwrap_or(0);
            return take_bytes(src, size);
        }
    }

    match type_info.prefix_width(col_type) {
        1 => {
            if src.remaining() < 1 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let len = src.get_u8() as usize;
            let mut out = bytes::BytesMut::with_capacity(1 + len);
            out.put_u8(len as u8);
            if len > 0 {
                out.extend_from_slice(&take_bytes(src, len)?);
            }
            Ok(out.freeze())
        }
        2 => {
            if src.remaining() < 2 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let len = src.get_u16_le();
            let mut out = bytes::BytesMut::with_capacity(2 + len.min(0xFF00) as usize);
            out.put_u16_le(len);
            if len != 0xFFFF {
                out.extend_from_slice(&take_bytes(src, len as usize)?);
            }
            Ok(out.freeze())
        }
        _ => Err(ProtocolError::InvalidField {
            field: "column type",
            reason: alloc_format!("no framing rule for type 0x{col_type:02X}"),
        }),
    }
}

/// Read a PLP (partially length-prefixed) value: an 8-byte total-length
/// placeholder (`0xFFFFFFFFFFFFFFFF` marks NULL, any other value including
/// `0xFFFFFFFFFFFFFFFE` ["unknown length"] or `0` ["empty, present"] is
/// followed by zero or more 4-byte-length-prefixed chunks terminated by a
/// chunk length of `0`).
///
/// The chunk framing is consumed here and does not survive into the
/// returned `Bytes`, but NULL-ness does: the result is re-framed with a
/// 4-byte little-endian length prefix of its own (`0xFFFF_FFFF` for NULL,
/// otherwise the payload length), so a PLP value looks the same shape as
/// the 1-/2-byte-prefixed values `read_value` returns for other types —
/// self-describing once separated from its neighbors in a row buffer.
fn read_plp(src: &mut impl Buf) -> Result<Bytes, ProtocolError> {
    if src.remaining() < 8 {
        return Err(ProtocolError::UnexpectedEof);
    }
    let total_length = src.get_u64_le();
    if total_length == PLP_NULL {
        let mut out = bytes::BytesMut::with_capacity(4);
        out.put_u32_le(u32::MAX);
        return Ok(out.freeze());
    }

    let mut payload = bytes::BytesMut::new();
    loop {
        if src.remaining() < 4 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let chunk_len = src.get_u32_le() as usize;
        if chunk_len == 0 {
            break;
        }
        payload.extend_from_slice(&take_bytes(src, chunk_len)?);
    }

    let mut out = bytes::BytesMut::with_capacity(4 + payload.len());
    out.put_u32_le(payload.len() as u32);
    out.extend_from_slice(&payload);
    Ok(out.freeze())
}

/// Sentinel total-length value marking a PLP column as NULL.
const PLP_NULL: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Raw row data (column values concatenated in wire order, undecoded).
///
/// Decoding individual columns out of `data` is the job of the typed
/// accessor layer, which walks the same [`ColumnTable`] used here.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Raw column values, concatenated in wire order.
    pub data: Bytes,
}

/// Null bitmap compressed row.
#[derive(Debug, Clone)]
pub struct NbcRow {
    /// Null bitmap, one bit per column (bit set means the column is NULL
    /// and contributes no bytes to `data`).
    pub null_bitmap: Vec<u8>,
    /// Raw values for the non-null columns, concatenated in wire order.
    pub data: Bytes,
}

impl NbcRow {
    /// Whether the column at `index` is NULL per the bitmap.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        let byte = index / 8;
        let bit = index % 8;
        self.null_bitmap
            .get(byte)
            .is_some_and(|b| (b & (1 << bit)) != 0)
    }
}

/// Done token indicating statement completion.
#[derive(Debug, Clone, Copy)]
pub struct Done {
    /// Status flags.
    pub status: DoneStatus,
    /// Current command.
    pub cur_cmd: u16,
    /// Row count (if applicable).
    pub row_count: u64,
}

/// Done status flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoneStatus {
    /// More results follow.
    pub more: bool,
    /// Error occurred.
    pub error: bool,
    /// Transaction in progress.
    pub in_xact: bool,
    /// Row count is valid.
    pub count: bool,
    /// Attention acknowledgment.
    pub attn: bool,
    /// Server error caused statement termination.
    pub srverror: bool,
}

/// Done in procedure token.
#[derive(Debug, Clone, Copy)]
pub struct DoneInProc {
    /// Status flags.
    pub status: DoneStatus,
    /// Current command.
    pub cur_cmd: u16,
    /// Row count.
    pub row_count: u64,
}

/// Done procedure token.
#[derive(Debug, Clone, Copy)]
pub struct DoneProc {
    /// Status flags.
    pub status: DoneStatus,
    /// Current command.
    pub cur_cmd: u16,
    /// Row count.
    pub row_count: u64,
}

/// Return value from stored procedure (output parameter or function result).
#[derive(Debug, Clone)]
pub struct ReturnValue {
    /// Parameter ordinal.
    pub param_ordinal: u16,
    /// Parameter name (empty for the return value itself).
    pub param_name: String,
    /// Status flags (1 = output parameter).
    pub status: u8,
    /// User type.
    pub user_type: u32,
    /// Type flags.
    pub flags: u16,
    /// Type info.
    pub type_info: TypeInfo,
    /// Raw, undecoded value bytes (including any length prefix).
    pub value: Bytes,
}

impl ReturnValue {
    /// Decode a `RETURNVALUE` token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let param_ordinal = src.get_u16_le();
        let param_name = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;

        if src.remaining() < 7 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let status = src.get_u8();
        let user_type = src.get_u32_le();
        let flags = src.get_u16_le();

        if src.remaining() < 1 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let col_type = src.get_u8();
        let type_info = TypeInfo::decode(col_type, src)?;
        let value = read_value(src, col_type, &type_info)?;

        Ok(Self {
            param_ordinal,
            param_name,
            status,
            user_type,
            flags,
            type_info,
            value,
        })
    }
}

/// Copy `len` bytes out of `src` as an owned [`Bytes`], advancing `src`.
///
/// `Buf` doesn't guarantee a contiguous `&[u8]` in general, so this copies
/// byte-by-byte into a fresh buffer rather than assuming `chunk()` covers
/// the whole span.
fn take_bytes(src: &mut impl Buf, len: usize) -> Result<Bytes, ProtocolError> {
    if src.remaining() < len {
        return Err(ProtocolError::UnexpectedEof);
    }
    Ok(src.copy_to_bytes(len))
}

/// Server error message.
#[derive(Debug, Clone)]
pub struct ServerError {
    /// Error number.
    pub number: i32,
    /// Error state.
    pub state: u8,
    /// Error severity class.
    pub class: u8,
    /// Error message text.
    pub message: String,
    /// Server name.
    pub server: String,
    /// Procedure name.
    pub procedure: String,
    /// Line number.
    pub line: i32,
}

/// Server informational message.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Info number.
    pub number: i32,
    /// Info state.
    pub state: u8,
    /// Info class (severity).
    pub class: u8,
    /// Info message text.
    pub message: String,
    /// Server name.
    pub server: String,
    /// Procedure name.
    pub procedure: String,
    /// Line number.
    pub line: i32,
}

/// Login acknowledgment token.
#[derive(Debug, Clone)]
pub struct LoginAck {
    /// Interface type.
    pub interface: u8,
    /// TDS version.
    pub tds_version: u32,
    /// Program name.
    pub prog_name: String,
    /// Program version.
    pub prog_version: u32,
}

/// Environment change token.
#[derive(Debug, Clone)]
pub struct EnvChange {
    /// Type of environment change.
    pub env_type: EnvChangeType,
    /// New value.
    pub new_value: EnvChangeValue,
    /// Old value.
    pub old_value: EnvChangeValue,
}

/// Environment change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnvChangeType {
    /// Database changed.
    Database = 1,
    /// Language changed.
    Language = 2,
    /// Character set changed.
    CharacterSet = 3,
    /// Packet size changed.
    PacketSize = 4,
    /// Unicode data sorting locale ID.
    UnicodeSortingLocalId = 5,
    /// Unicode comparison flags.
    UnicodeComparisonFlags = 6,
    /// SQL collation.
    SqlCollation = 7,
    /// Begin transaction.
    BeginTransaction = 8,
    /// Commit transaction.
    CommitTransaction = 9,
    /// Rollback transaction.
    RollbackTransaction = 10,
    /// Enlist DTC transaction.
    EnlistDtcTransaction = 11,
    /// Defect DTC transaction.
    DefectTransaction = 12,
    /// Real-time log shipping.
    RealTimeLogShipping = 13,
    /// Promote transaction.
    PromoteTransaction = 15,
    /// Transaction manager address.
    TransactionManagerAddress = 16,
    /// Transaction ended.
    TransactionEnded = 17,
    /// Reset connection completion acknowledgment.
    ResetConnectionCompletionAck = 18,
    /// User instance started.
    UserInstanceStarted = 19,
    /// Routing information.
    Routing = 20,
}

/// Environment change value.
#[derive(Debug, Clone)]
pub enum EnvChangeValue {
    /// String value.
    String(String),
    /// Binary value.
    Binary(Bytes),
    /// Routing information.
    Routing {
        /// Host name.
        host: String,
        /// Port number.
        port: u16,
    },
}

/// Column ordering information.
#[derive(Debug, Clone)]
pub struct Order {
    /// Ordered column indices.
    pub columns: Vec<u16>,
}

// =============================================================================
// Token Parsing Implementation
// =============================================================================

/// Done token status flags bit positions.
mod done_status_bits {
    pub const DONE_MORE: u16 = 0x0001;
    pub const DONE_ERROR: u16 = 0x0002;
    pub const DONE_INXACT: u16 = 0x0004;
    pub const DONE_COUNT: u16 = 0x0010;
    pub const DONE_ATTN: u16 = 0x0020;
    pub const DONE_SRVERROR: u16 = 0x0100;
}

impl DoneStatus {
    /// Parse done status from raw bits.
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        use done_status_bits::*;
        Self {
            more: (bits & DONE_MORE) != 0,
            error: (bits & DONE_ERROR) != 0,
            in_xact: (bits & DONE_INXACT) != 0,
            count: (bits & DONE_COUNT) != 0,
            attn: (bits & DONE_ATTN) != 0,
            srverror: (bits & DONE_SRVERROR) != 0,
        }
    }

    /// Convert to raw bits.
    #[must_use]
    pub fn to_bits(&self) -> u16 {
        use done_status_bits::*;
        let mut bits = 0u16;
        if self.more {
            bits |= DONE_MORE;
        }
        if self.error {
            bits |= DONE_ERROR;
        }
        if self.in_xact {
            bits |= DONE_INXACT;
        }
        if self.count {
            bits |= DONE_COUNT;
        }
        if self.attn {
            bits |= DONE_ATTN;
        }
        if self.srverror {
            bits |= DONE_SRVERROR;
        }
        bits
    }
}

impl Done {
    /// Size of the DONE token in bytes (excluding token type byte).
    pub const SIZE: usize = 12; // 2 (status) + 2 (curcmd) + 8 (rowcount)

    /// Decode a DONE token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::SIZE {
            return Err(ProtocolError::IncompletePacket {
                expected: Self::SIZE,
                actual: src.remaining(),
            });
        }

        let status = DoneStatus::from_bits(src.get_u16_le());
        let cur_cmd = src.get_u16_le();
        let row_count = src.get_u64_le();

        Ok(Self {
            status,
            cur_cmd,
            row_count,
        })
    }

    /// Encode the DONE token to bytes.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(TokenType::Done as u8);
        dst.put_u16_le(self.status.to_bits());
        dst.put_u16_le(self.cur_cmd);
        dst.put_u64_le(self.row_count);
    }

    /// Check if more results follow this DONE token.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.status.more
    }

    /// Check if an error occurred.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.status.error
    }

    /// Check if the row count is valid.
    #[must_use]
    pub const fn has_count(&self) -> bool {
        self.status.count
    }
}

impl DoneProc {
    /// Size of the DONEPROC token in bytes (excluding token type byte).
    pub const SIZE: usize = 12;

    /// Decode a DONEPROC token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::SIZE {
            return Err(ProtocolError::IncompletePacket {
                expected: Self::SIZE,
                actual: src.remaining(),
            });
        }

        let status = DoneStatus::from_bits(src.get_u16_le());
        let cur_cmd = src.get_u16_le();
        let row_count = src.get_u64_le();

        Ok(Self {
            status,
            cur_cmd,
            row_count,
        })
    }

    /// Encode the DONEPROC token to bytes.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(TokenType::DoneProc as u8);
        dst.put_u16_le(self.status.to_bits());
        dst.put_u16_le(self.cur_cmd);
        dst.put_u64_le(self.row_count);
    }
}

impl DoneInProc {
    /// Size of the DONEINPROC token in bytes (excluding token type byte).
    pub const SIZE: usize = 12;

    /// Decode a DONEINPROC token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::SIZE {
            return Err(ProtocolError::IncompletePacket {
                expected: Self::SIZE,
                actual: src.remaining(),
            });
        }

        let status = DoneStatus::from_bits(src.get_u16_le());
        let cur_cmd = src.get_u16_le();
        let row_count = src.get_u64_le();

        Ok(Self {
            status,
            cur_cmd,
            row_count,
        })
    }

    /// Encode the DONEINPROC token to bytes.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(TokenType::DoneInProc as u8);
        dst.put_u16_le(self.status.to_bits());
        dst.put_u16_le(self.cur_cmd);
        dst.put_u64_le(self.row_count);
    }
}

impl ServerError {
    /// Decode an ERROR token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        // ERROR token: length (2) + number (4) + state (1) + class (1) +
        //              message (us_varchar) + server (b_varchar) + procedure (b_varchar) + line (4)
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let _length = src.get_u16_le();

        if src.remaining() < 6 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let number = src.get_i32_le();
        let state = src.get_u8();
        let class = src.get_u8();

        let message = read_us_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
        let server = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
        let procedure = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;

        if src.remaining() < 4 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let line = src.get_i32_le();

        Ok(Self {
            number,
            state,
            class,
            message,
            server,
            procedure,
            line,
        })
    }

    /// Check if this is a fatal error (severity >= 20).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.class >= 20
    }

    /// Check if this error indicates the batch was aborted (severity >= 16).
    #[must_use]
    pub const fn is_batch_abort(&self) -> bool {
        self.class >= 16
    }
}

impl ServerInfo {
    /// Decode an INFO token from bytes.
    ///
    /// INFO tokens have the same structure as ERROR tokens but with lower severity.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let _length = src.get_u16_le();

        if src.remaining() < 6 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let number = src.get_i32_le();
        let state = src.get_u8();
        let class = src.get_u8();

        let message = read_us_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
        let server = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;
        let procedure = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;

        if src.remaining() < 4 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let line = src.get_i32_le();

        Ok(Self {
            number,
            state,
            class,
            message,
            server,
            procedure,
            line,
        })
    }
}

impl LoginAck {
    /// Decode a LOGINACK token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        // LOGINACK: length (2) + interface (1) + tds_version (4) + prog_name (b_varchar) + prog_version (4)
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let _length = src.get_u16_le();

        if src.remaining() < 5 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let interface = src.get_u8();
        let tds_version = src.get_u32();
        let prog_name = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;

        if src.remaining() < 4 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let prog_version = src.get_u32_le();

        Ok(Self {
            interface,
            tds_version,
            prog_name,
            prog_version,
        })
    }

    /// Get the TDS version as a `TdsVersion`.
    #[must_use]
    pub fn tds_version(&self) -> crate::version::TdsVersion {
        crate::version::TdsVersion::new(self.tds_version)
    }
}

impl EnvChangeType {
    /// Create from raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Database),
            2 => Some(Self::Language),
            3 => Some(Self::CharacterSet),
            4 => Some(Self::PacketSize),
            5 => Some(Self::UnicodeSortingLocalId),
            6 => Some(Self::UnicodeComparisonFlags),
            7 => Some(Self::SqlCollation),
            8 => Some(Self::BeginTransaction),
            9 => Some(Self::CommitTransaction),
            10 => Some(Self::RollbackTransaction),
            11 => Some(Self::EnlistDtcTransaction),
            12 => Some(Self::DefectTransaction),
            13 => Some(Self::RealTimeLogShipping),
            15 => Some(Self::PromoteTransaction),
            16 => Some(Self::TransactionManagerAddress),
            17 => Some(Self::TransactionEnded),
            18 => Some(Self::ResetConnectionCompletionAck),
            19 => Some(Self::UserInstanceStarted),
            20 => Some(Self::Routing),
            _ => None,
        }
    }
}

impl EnvChange {
    /// Decode an ENVCHANGE token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 3 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let length = src.get_u16_le() as usize;
        if src.remaining() < length {
            return Err(ProtocolError::IncompletePacket {
                expected: length,
                actual: src.remaining(),
            });
        }

        let env_type_byte = src.get_u8();
        let env_type = EnvChangeType::from_u8(env_type_byte)
            .ok_or(ProtocolError::InvalidTokenType(env_type_byte))?;

        let (new_value, old_value) = match env_type {
            EnvChangeType::Routing => {
                // Routing has special format
                let new_value = Self::decode_routing_value(src)?;
                let old_value = EnvChangeValue::Binary(Bytes::new());
                (new_value, old_value)
            }
            EnvChangeType::BeginTransaction
            | EnvChangeType::CommitTransaction
            | EnvChangeType::RollbackTransaction
            | EnvChangeType::EnlistDtcTransaction => {
                // Transaction tokens use binary format
                let new_len = src.get_u8() as usize;
                let new_value = if new_len > 0 && src.remaining() >= new_len {
                    EnvChangeValue::Binary(src.copy_to_bytes(new_len))
                } else {
                    EnvChangeValue::Binary(Bytes::new())
                };

                let old_len = src.get_u8() as usize;
                let old_value = if old_len > 0 && src.remaining() >= old_len {
                    EnvChangeValue::Binary(src.copy_to_bytes(old_len))
                } else {
                    EnvChangeValue::Binary(Bytes::new())
                };

                (new_value, old_value)
            }
            _ => {
                // String format for most env changes
                let new_value = read_b_varchar(src)
                    .map(EnvChangeValue::String)
                    .unwrap_or(EnvChangeValue::String(String::new()));

                let old_value = read_b_varchar(src)
                    .map(EnvChangeValue::String)
                    .unwrap_or(EnvChangeValue::String(String::new()));

                (new_value, old_value)
            }
        };

        Ok(Self {
            env_type,
            new_value,
            old_value,
        })
    }

    fn decode_routing_value(src: &mut impl Buf) -> Result<EnvChangeValue, ProtocolError> {
        // Routing format: length (2) + protocol (1) + port (2) + server_len (2) + server (utf16)
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let _routing_len = src.get_u16_le();

        if src.remaining() < 5 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let _protocol = src.get_u8();
        let port = src.get_u16_le();
        let server_len = src.get_u16_le() as usize;

        // Read UTF-16LE server name
        if src.remaining() < server_len * 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let mut chars = Vec::with_capacity(server_len);
        for _ in 0..server_len {
            chars.push(src.get_u16_le());
        }

        let host = String::from_utf16(&chars).map_err(|_| {
            ProtocolError::StringEncoding(
                #[cfg(feature = "std")]
                "invalid UTF-16 in routing hostname".to_string(),
                #[cfg(not(feature = "std"))]
                "invalid UTF-16 in routing hostname",
            )
        })?;

        Ok(EnvChangeValue::Routing { host, port })
    }

    /// Check if this is a routing redirect.
    #[must_use]
    pub fn is_routing(&self) -> bool {
        self.env_type == EnvChangeType::Routing
    }

    /// Get routing information if this is a routing change.
    #[must_use]
    pub fn routing_info(&self) -> Option<(&str, u16)> {
        if let EnvChangeValue::Routing { host, port } = &self.new_value {
            Some((host, *port))
        } else {
            None
        }
    }

    /// Get the new database name if this is a database change.
    #[must_use]
    pub fn new_database(&self) -> Option<&str> {
        if self.env_type == EnvChangeType::Database {
            if let EnvChangeValue::String(s) = &self.new_value {
                return Some(s);
            }
        }
        None
    }
}

impl Order {
    /// Decode an ORDER token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }

        let length = src.get_u16_le() as usize;
        let column_count = length / 2;

        if src.remaining() < length {
            return Err(ProtocolError::IncompletePacket {
                expected: length,
                actual: src.remaining(),
            });
        }

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            columns.push(src.get_u16_le());
        }

        Ok(Self { columns })
    }
}

impl ColMetaData {
    /// Decode a COLMETADATA token from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < 2 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let count = src.get_u16_le();

        // 0xFFFF signals "no metadata" (e.g. in response to a DDL statement).
        if count == 0xFFFF {
            return Ok(Self::default());
        }

        let mut columns = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if src.remaining() < 6 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let user_type = src.get_u32_le();
            let flags = src.get_u16_le();

            if src.remaining() < 1 {
                return Err(ProtocolError::UnexpectedEof);
            }
            let col_type = src.get_u8();
            let type_info = TypeInfo::decode(col_type, src)?;
            let name = read_b_varchar(src).ok_or(ProtocolError::UnexpectedEof)?;

            columns.push(ColumnData {
                name,
                user_type,
                flags,
                col_type,
                type_info,
            });
        }

        Ok(Self { columns })
    }
}

impl RawRow {
    /// Decode a ROW token from bytes using the preceding COLMETADATA.
    pub fn decode(src: &mut impl Buf, columns: &ColumnTable) -> Result<Self, ProtocolError> {
        let mut data = bytes::BytesMut::new();
        for column in &columns.columns {
            let value = read_value(src, column.col_type, &column.type_info)?;
            data.extend_from_slice(&value);
        }
        Ok(Self {
            data: data.freeze(),
        })
    }
}

impl NbcRow {
    /// Decode an NBCROW token from bytes using the preceding COLMETADATA.
    pub fn decode(src: &mut impl Buf, columns: &ColumnTable) -> Result<Self, ProtocolError> {
        let bitmap_len = columns.columns.len().div_ceil(8);
        if src.remaining() < bitmap_len {
            return Err(ProtocolError::UnexpectedEof);
        }
        let mut null_bitmap = Vec::with_capacity(bitmap_len);
        for _ in 0..bitmap_len {
            null_bitmap.push(src.get_u8());
        }

        let is_null = |bitmap: &[u8], index: usize| {
            let byte = index / 8;
            let bit = index % 8;
            bitmap.get(byte).is_some_and(|b| (b & (1 << bit)) != 0)
        };

        let mut data = bytes::BytesMut::new();
        for (index, column) in columns.columns.iter().enumerate() {
            if is_null(&null_bitmap, index) {
                continue;
            }
            let value = read_value(src, column.col_type, &column.type_info)?;
            data.extend_from_slice(&value);
        }

        Ok(Self {
            null_bitmap,
            data: data.freeze(),
        })
    }
}

// =============================================================================
// Token Parser
// =============================================================================

/// Token stream parser.
///
/// Parses a stream of TDS tokens from a byte buffer. `COLMETADATA` is
/// returned as an ordinary [`Token`]; callers are expected to convert it
/// into a [`ColumnTable`] and pass that table back in on every subsequent
/// call so `ROW`/`NBCROW`/`RETURNVALUE` tokens in the same result set can
/// be decoded.
pub struct TokenParser {
    data: Bytes,
    position: usize,
}

impl TokenParser {
    /// Create a new token parser from bytes.
    #[must_use]
    pub fn new(data: Bytes) -> Self {
        Self { data, position: 0 }
    }

    /// Replace the underlying buffer, e.g. after appending a newly received
    /// packet's payload. Any bytes already consumed remain consumed.
    pub fn extend(&mut self, more: &[u8]) {
        let mut buf = bytes::BytesMut::with_capacity(self.remaining() + more.len());
        buf.extend_from_slice(&self.data[self.position..]);
        buf.extend_from_slice(more);
        self.data = buf.freeze();
        self.position = 0;
    }

    /// Get remaining bytes in the buffer.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are more bytes to parse.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

    /// Parse the next token from the stream.
    ///
    /// On `ParseOutcome::NeedMoreData`, no bytes were consumed: call
    /// [`TokenParser::extend`] with the next packet's payload and retry.
    pub fn next_token(&mut self, columns: &ColumnTable) -> Result<ParseOutcome, ProtocolError> {
        if !self.has_remaining() {
            return Ok(ParseOutcome::EndOfStream);
        }

        let start_pos = self.position;
        let mut buf = &self.data[self.position..];

        match self.decode_one(&mut buf, columns) {
            Ok(token) => {
                let consumed = self.data.len() - start_pos - buf.remaining();
                self.position = start_pos + consumed;
                Ok(ParseOutcome::Token(token))
            }
            Err(ProtocolError::UnexpectedEof | ProtocolError::IncompletePacket { .. }) => {
                // Leave position untouched so the caller can top up the
                // buffer and retry the same token from scratch.
                Ok(ParseOutcome::NeedMoreData)
            }
            Err(other) => Err(other),
        }
    }

    fn decode_one(
        &self,
        buf: &mut &[u8],
        columns: &ColumnTable,
    ) -> Result<Token, ProtocolError> {
        let token_type_byte = buf.get_u8();
        let token_type =
            TokenType::from_u8(token_type_byte).ok_or(ProtocolError::InvalidTokenType(token_type_byte))?;

        let token = match token_type {
            TokenType::Done => Token::Done(Done::decode(buf)?),
            TokenType::DoneProc => Token::DoneProc(DoneProc::decode(buf)?),
            TokenType::DoneInProc => Token::DoneInProc(DoneInProc::decode(buf)?),
            TokenType::Error => Token::Error(ServerError::decode(buf)?),
            TokenType::Info => Token::Info(ServerInfo::decode(buf)?),
            TokenType::LoginAck => Token::LoginAck(LoginAck::decode(buf)?),
            TokenType::EnvChange => Token::EnvChange(EnvChange::decode(buf)?),
            TokenType::Order => Token::Order(Order::decode(buf)?),
            TokenType::ReturnStatus => {
                if buf.remaining() < 4 {
                    return Err(ProtocolError::UnexpectedEof);
                }
                Token::ReturnStatus(buf.get_i32_le())
            }
            TokenType::ReturnValue => Token::ReturnValue(ReturnValue::decode(buf)?),
            TokenType::ColMetaData => Token::ColMetaData(ColMetaData::decode(buf)?),
            TokenType::Row => Token::Row(RawRow::decode(buf, columns)?),
            TokenType::NbcRow => Token::NbcRow(NbcRow::decode(buf, columns)?),
        };

        Ok(token)
    }
}

// =============================================================================
// no_std support
// =============================================================================

#[cfg(not(feature = "std"))]
use alloc::format as alloc_format;
#[cfg(feature = "std")]
use std::format as alloc_format;

#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_collation_is_utf8_flag() {
        let utf8 = Collation {
            lcid: 0x0000_0409 | 0x0800_0000,
            sort_id: 0,
        };
        assert!(utf8.is_utf8());

        let latin1 = Collation {
            lcid: 0x0000_0409,
            sort_id: 0,
        };
        assert!(!latin1.is_utf8());
    }

    #[cfg(feature = "encoding")]
    #[test]
    fn test_collation_encoding_for_known_lcids() {
        let japanese = Collation {
            lcid: 0x0000_0411,
            sort_id: 0,
        };
        assert_eq!(japanese.encoding_name(), "Shift_JIS");

        let utf8 = Collation {
            lcid: 0x0409 | 0x0800_0000,
            sort_id: 0,
        };
        assert_eq!(utf8.encoding_name(), "UTF-8");

        let western = Collation {
            lcid: 0x0000_0409,
            sort_id: 0,
        };
        assert_eq!(western.encoding_name(), "windows-1252");
    }

    #[test]
    fn test_done_roundtrip() {
        let done = Done {
            status: DoneStatus {
                more: false,
                error: false,
                in_xact: false,
                count: true,
                attn: false,
                srverror: false,
            },
            cur_cmd: 193, // SELECT
            row_count: 42,
        };

        let mut buf = BytesMut::new();
        done.encode(&mut buf);

        // Skip the token type byte
        let mut cursor = &buf[1..];
        let decoded = Done::decode(&mut cursor).unwrap();

        assert_eq!(decoded.status.count, done.status.count);
        assert_eq!(decoded.cur_cmd, done.cur_cmd);
        assert_eq!(decoded.row_count, done.row_count);
    }

    #[test]
    fn test_done_status_bits() {
        let status = DoneStatus {
            more: true,
            error: true,
            in_xact: true,
            count: true,
            attn: false,
            srverror: false,
        };

        let bits = status.to_bits();
        let restored = DoneStatus::from_bits(bits);

        assert_eq!(status.more, restored.more);
        assert_eq!(status.error, restored.error);
        assert_eq!(status.in_xact, restored.in_xact);
        assert_eq!(status.count, restored.count);
    }

    #[test]
    fn test_token_parser_done() {
        // DONE token: type (1) + status (2) + curcmd (2) + rowcount (8)
        let data = Bytes::from_static(&[
            0xFD, // DONE token type
            0x10, 0x00, // status: DONE_COUNT
            0xC1, 0x00, // cur_cmd: 193 (SELECT)
            0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // row_count: 5
        ]);

        let mut parser = TokenParser::new(data);
        let columns = ColumnTable::default();
        let outcome = parser.next_token(&columns).unwrap();

        match outcome {
            ParseOutcome::Token(Token::Done(done)) => {
                assert!(done.status.count);
                assert!(!done.status.more);
                assert_eq!(done.cur_cmd, 193);
                assert_eq!(done.row_count, 5);
            }
            other => panic!("expected Done token, got {other:?}"),
        }

        // No more tokens
        assert!(matches!(
            parser.next_token(&columns).unwrap(),
            ParseOutcome::EndOfStream
        ));
    }

    #[test]
    fn test_token_parser_needs_more_data_then_resumes() {
        // A DONE token split across two "packets": first only 5 of 13 bytes.
        let first = Bytes::from_static(&[0xFD, 0x10, 0x00, 0xC1, 0x00]);
        let mut parser = TokenParser::new(first);
        let columns = ColumnTable::default();

        assert!(matches!(
            parser.next_token(&columns).unwrap(),
            ParseOutcome::NeedMoreData
        ));

        parser.extend(&[0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        match parser.next_token(&columns).unwrap() {
            ParseOutcome::Token(Token::Done(done)) => {
                assert_eq!(done.row_count, 5);
            }
            other => panic!("expected Done token, got {other:?}"),
        }
    }

    #[test]
    fn test_env_change_type_from_u8() {
        assert_eq!(EnvChangeType::from_u8(1), Some(EnvChangeType::Database));
        assert_eq!(EnvChangeType::from_u8(20), Some(EnvChangeType::Routing));
        assert_eq!(EnvChangeType::from_u8(100), None);
    }

    #[test]
    fn test_colmetadata_and_row_roundtrip() {
        // Two columns: INT (0x38, fixed), NVARCHAR(10) (0xE7).
        let mut meta = BytesMut::new();
        meta.put_u16_le(2); // column count

        // Column 1: INT
        meta.put_u32_le(0); // user_type
        meta.put_u16_le(0); // flags
        meta.put_u8(0x38); // INT4TYPE
        meta.put_u8(1); // name length
        meta.put_u16_le(b'a' as u16);

        // Column 2: NVARCHAR(10)
        meta.put_u32_le(0);
        meta.put_u16_le(0);
        meta.put_u8(0xE7); // NVARCHARTYPE
        meta.put_u16_le(20); // max_length in bytes
        meta.put_u32_le(0x0409_0000); // lcid
        meta.put_u8(0); // sort_id
        meta.put_u8(1); // name length
        meta.put_u16_le(b'b' as u16);

        let mut row = BytesMut::new();
        row.put_i32_le(42); // INT value
        row.put_u16_le(4); // NVARCHAR byte length ("hi" = 2 chars)
        row.put_u16_le(b'h' as u16);
        row.put_u16_le(b'i' as u16);

        let mut data = BytesMut::new();
        data.put_u8(TokenType::ColMetaData as u8);
        data.extend_from_slice(&meta);
        data.put_u8(TokenType::Row as u8);
        data.extend_from_slice(&row);

        let mut parser = TokenParser::new(data.freeze());
        let mut columns = ColumnTable::default();

        let meta_token = match parser.next_token(&columns).unwrap() {
            ParseOutcome::Token(Token::ColMetaData(m)) => m,
            other => panic!("expected ColMetaData, got {other:?}"),
        };
        assert_eq!(meta_token.columns.len(), 2);
        columns = ColumnTable::from(&meta_token);

        let row_token = match parser.next_token(&columns).unwrap() {
            ParseOutcome::Token(Token::Row(r)) => r,
            other => panic!("expected Row, got {other:?}"),
        };
        // 4 bytes INT + 2 bytes length prefix + 4 bytes payload = 10
        assert_eq!(row_token.data.len(), 10);
    }

    #[test]
    fn test_nbcrow_skips_null_columns() {
        let mut columns = ColumnTable::default();
        columns.columns.push(ColumnData {
            name: "a".into(),
            user_type: 0,
            flags: 0,
            col_type: 0x38, // INT
            type_info: TypeInfo::default(),
        });
        columns.columns.push(ColumnData {
            name: "b".into(),
            user_type: 0,
            flags: 0,
            col_type: 0x38, // INT
            type_info: TypeInfo::default(),
        });

        let mut data = BytesMut::new();
        data.put_u8(TokenType::NbcRow as u8);
        data.put_u8(0b0000_0010); // column 1 is NULL, column 0 is not
        data.put_i32_le(7); // only column 0's value is present

        let mut parser = TokenParser::new(data.freeze());
        match parser.next_token(&columns).unwrap() {
            ParseOutcome::Token(Token::NbcRow(row)) => {
                assert!(!row.is_null(0));
                assert!(row.is_null(1));
                assert_eq!(row.data.len(), 4);
            }
            other => panic!("expected NbcRow, got {other:?}"),
        }
    }
}
