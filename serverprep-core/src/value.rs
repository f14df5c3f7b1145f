use bytes::BufMut;
use rust_decimal::Decimal;
use std::{
    fmt::{self, Display, Write},
    sync::Arc,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

/// Wire type code of a binary protocol value, as sent in the parameter type header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    DateTime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

/// A bind value.
///
/// The set of variants is closed: each one has a fixed wire type and a fixed binary
/// layout. Every variant but `Null` carries an `Option`, `None` being a typed NULL.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    /// Stream parameter, sent to the server in chunks before the execute command.
    LongData(Option<Arc<[u8]>>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int8(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::UInt8(None)
            | Value::UInt16(None)
            | Value::UInt32(None)
            | Value::UInt64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::LongData(None) => true,
            _ => false,
        }
    }

    pub fn is_long_data(&self) -> bool {
        matches!(self, Value::LongData(..))
    }

    /// Payload of a long data parameter, sent apart from the execute packet.
    pub fn long_data(&self) -> Option<&[u8]> {
        match self {
            Value::LongData(Some(v)) => Some(v),
            _ => None,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Boolean(..) | Value::Int8(..) | Value::UInt8(..) => ColumnType::Tiny,
            Value::Int16(..) | Value::UInt16(..) => ColumnType::Short,
            Value::Int32(..) | Value::UInt32(..) => ColumnType::Long,
            Value::Int64(..) | Value::UInt64(..) => ColumnType::LongLong,
            Value::Float32(..) => ColumnType::Float,
            Value::Float64(..) => ColumnType::Double,
            Value::Decimal(..) => ColumnType::NewDecimal,
            Value::Varchar(..) | Value::Uuid(..) => ColumnType::VarString,
            Value::Blob(..) | Value::LongData(..) => ColumnType::Blob,
            Value::Date(..) => ColumnType::Date,
            Value::Time(..) => ColumnType::Time,
            Value::Timestamp(..) | Value::TimestampWithTimezone(..) => ColumnType::DateTime,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Value::UInt8(..) | Value::UInt16(..) | Value::UInt32(..) | Value::UInt64(..)
        )
    }

    /// Write the binary protocol representation of the value.
    ///
    /// NULL values and long data write nothing: the former travel in the null bitmap,
    /// the latter are sent ahead of the execute command.
    pub fn encode_binary(&self, out: &mut impl BufMut) {
        match self {
            _ if self.is_null() => {}
            Value::Boolean(Some(v)) => out.put_u8(*v as u8),
            Value::Int8(Some(v)) => out.put_i8(*v),
            Value::Int16(Some(v)) => out.put_i16_le(*v),
            Value::Int32(Some(v)) => out.put_i32_le(*v),
            Value::Int64(Some(v)) => out.put_i64_le(*v),
            Value::UInt8(Some(v)) => out.put_u8(*v),
            Value::UInt16(Some(v)) => out.put_u16_le(*v),
            Value::UInt32(Some(v)) => out.put_u32_le(*v),
            Value::UInt64(Some(v)) => out.put_u64_le(*v),
            Value::Float32(Some(v)) => out.put_f32_le(*v),
            Value::Float64(Some(v)) => out.put_f64_le(*v),
            Value::Decimal(Some(v)) => put_lenenc_bytes(out, v.to_string().as_bytes()),
            Value::Varchar(Some(v)) => put_lenenc_bytes(out, v.as_bytes()),
            Value::Blob(Some(v)) => put_lenenc_bytes(out, v),
            Value::Uuid(Some(v)) => put_lenenc_bytes(out, v.hyphenated().to_string().as_bytes()),
            Value::Date(Some(v)) => {
                out.put_u8(4);
                put_date(out, v);
            }
            Value::Time(Some(v)) => {
                let micros = v.microsecond();
                out.put_u8(if micros == 0 { 8 } else { 12 });
                out.put_u8(0);
                out.put_u32_le(0);
                out.put_u8(v.hour());
                out.put_u8(v.minute());
                out.put_u8(v.second());
                if micros != 0 {
                    out.put_u32_le(micros);
                }
            }
            Value::Timestamp(Some(v)) => put_date_time(out, v),
            Value::TimestampWithTimezone(Some(v)) => {
                let v = v.to_offset(UtcOffset::UTC);
                put_date_time(out, &PrimitiveDateTime::new(v.date(), v.time()));
            }
            _ => {}
        }
    }
}

fn put_lenenc_int(out: &mut impl BufMut, value: u64) {
    if value < 251 {
        out.put_u8(value as u8);
    } else if value < 1 << 16 {
        out.put_u8(0xfc);
        out.put_u16_le(value as u16);
    } else if value < 1 << 24 {
        out.put_u8(0xfd);
        out.put_uint_le(value, 3);
    } else {
        out.put_u8(0xfe);
        out.put_u64_le(value);
    }
}

fn put_lenenc_bytes(out: &mut impl BufMut, value: &[u8]) {
    put_lenenc_int(out, value.len() as u64);
    out.put_slice(value);
}

fn put_date(out: &mut impl BufMut, date: &Date) {
    out.put_u16_le(date.year() as u16);
    out.put_u8(date.month().into());
    out.put_u8(date.day());
}

fn put_date_time(out: &mut impl BufMut, value: &PrimitiveDateTime) {
    let micros = value.microsecond();
    out.put_u8(if micros == 0 { 7 } else { 11 });
    put_date(out, &value.date());
    out.put_u8(value.hour());
    out.put_u8(value.minute());
    out.put_u8(value.second());
    if micros != 0 {
        out.put_u32_le(micros);
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: impl Display) -> fmt::Result {
    f.write_char('\'')?;
    for c in value.to_string().chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\0' => f.write_str("\\0")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

/// Textual form used in diagnostics, never sent to the server.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            _ if self.is_null() => f.write_str("NULL"),
            Value::Boolean(Some(v)) => write!(f, "{}", *v as u8),
            Value::Int8(Some(v)) => write!(f, "{v}"),
            Value::Int16(Some(v)) => write!(f, "{v}"),
            Value::Int32(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::UInt8(Some(v)) => write!(f, "{v}"),
            Value::UInt16(Some(v)) => write!(f, "{v}"),
            Value::UInt32(Some(v)) => write!(f, "{v}"),
            Value::UInt64(Some(v)) => write!(f, "{v}"),
            Value::Float32(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Decimal(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write_quoted(f, v),
            Value::Uuid(Some(v)) => write_quoted(f, v.hyphenated()),
            Value::Blob(..) => f.write_str("<binary data>"),
            Value::LongData(..) => f.write_str("<stream>"),
            Value::Date(Some(v)) => write_quoted(f, v),
            Value::Time(Some(v)) => write_quoted(f, v),
            Value::Timestamp(Some(v)) => write_quoted(f, v),
            Value::TimestampWithTimezone(Some(v)) => write_quoted(f, v),
            _ => f.write_str("NULL"),
        }
    }
}
