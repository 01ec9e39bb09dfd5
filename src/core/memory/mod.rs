//! Sistema de Memória de 64KB.
//! Gerencia o espaço de endereçamento plano, a persistência em disco
//! e os bancos (ROM/RAM/dinâmicos) sobrepostos a ele.

pub mod bus;
pub mod map;
pub mod space;
pub mod store;

// Re-exportações para facilitar o uso
pub use bus::{BankedMemory, MemoryAccess};
pub use map::{Bank, BankFlags, BankType, ReadHandler, WriteHandler};
pub use space::{AddressSpace, Endianness, MemoryConfig};
pub use store::{FileSource, RomSource, StreamSource};

use num_traits::ToPrimitive;
use thiserror::Error;

/// Tamanho do espaço de endereçamento (16-bit = 64 KB)
pub const ADDRESS_SPACE_SIZE: usize = 0x10000;

/// Maior endereço válido
pub const MAX_ADDRESS: u16 = 0xFFFF;

/// Erros do sistema de memória
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("address {0} out of range")]
    AddressOutOfRange(i128),

    #[error("value {value} out of range (max {max})")]
    ValueOutOfRange { value: i128, max: u32 },

    #[error("invalid bank range: start={start} size={size}")]
    RangeInvalid { start: i128, size: usize },

    #[error("ROM bank requires a source")]
    MissingSource,

    #[error("dynamic bank requires a read handler")]
    MissingHandler,

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("no bank starts at address {0:#06X}")]
    NoSuchBank(u16),

    #[error("backing store I/O error: {0}")]
    BackingStoreIo(#[from] std::io::Error),
}

/// Tipo de resultado para operações de memória
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Resultado de uma escrita aceita pela memória.
///
/// Uma escrita suprimida (ROM sem writethrough, banco dinâmico sem handler
/// de escrita) não é erro: a operação é válida, só não teve efeito.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WriteStatus {
    Suppressed = 0,
    Written = 1,
}

impl WriteStatus {
    /// Código numérico (0 = suprimida, 1 = escrita)
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_written(self) -> bool {
        self == WriteStatus::Written
    }
}

impl From<WriteStatus> for u8 {
    fn from(status: WriteStatus) -> u8 {
        status.code()
    }
}

/// Valor usado nas mensagens de erro quando a entrada nem cabe em i128
pub(crate) fn reported<T: ToPrimitive>(value: &T) -> i128 {
    value.to_i128().unwrap_or(i128::MAX)
}

/// Valida um endereço contra um espaço de `limit` bytes
pub(crate) fn check_address<A: ToPrimitive>(addr: A, limit: usize) -> MemoryResult<u16> {
    match addr.to_usize() {
        Some(a) if a < limit && a <= MAX_ADDRESS as usize => Ok(a as u16),
        _ => Err(MemoryError::AddressOutOfRange(reported(&addr))),
    }
}

/// Valida um valor de 8 bits
pub(crate) fn check_byte<V: ToPrimitive>(value: V) -> MemoryResult<u8> {
    value.to_u8().ok_or_else(|| MemoryError::ValueOutOfRange {
        value: reported(&value),
        max: u8::MAX as u32,
    })
}

/// Valida um valor de 16 bits
pub(crate) fn check_word<V: ToPrimitive>(value: V) -> MemoryResult<u16> {
    value.to_u16().ok_or_else(|| MemoryError::ValueOutOfRange {
        value: reported(&value),
        max: u16::MAX as u32,
    })
}
