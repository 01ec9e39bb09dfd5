//! Bancos sobrepostos ao espaço de endereçamento.
//! Cada banco cobre um intervalo semiaberto `[start, start + size)` e decide
//! como leituras e escritas nesse intervalo são atendidas.

use std::fmt;
use bitflags::bitflags;

use crate::core::memory::{MemoryError, MemoryResult, WriteStatus, ADDRESS_SPACE_SIZE};

/// Tipo de banco
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankType {
    Rom,        // Conteúdo fixo; escritas suprimidas ou repassadas (writethrough)
    Ram,        // Buffer próprio, isolado do espaço base
    Dynamic,    // Leituras/escritas atendidas por handlers
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankType::Rom => write!(f, "ROM"),
            BankType::Ram => write!(f, "RAM"),
            BankType::Dynamic => write!(f, "Dynamic"),
        }
    }
}

bitflags! {
    /// Opções de um banco
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BankFlags: u8 {
        /// Escritas numa ROM vão para o espaço base (visíveis após unbank)
        const WRITETHROUGH = 0b0000_0001;
    }
}

/// Handler de leitura de banco dinâmico (recebe o endereço absoluto)
pub type ReadHandler = Box<dyn Fn(u16) -> u8>;

/// Handler de escrita de banco dinâmico (recebe o endereço absoluto)
pub type WriteHandler = Box<dyn FnMut(u16, u8)>;

/// Conteúdo de um banco
pub(crate) enum BankContent {
    Rom(Box<[u8]>),
    Ram(Box<[u8]>),
    Dynamic {
        read: ReadHandler,
        write: Option<WriteHandler>,
    },
}

/// O que fazer com uma escrita que caiu num banco
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BankWrite {
    /// Tratada pelo próprio banco
    Done(WriteStatus),
    /// Repassar ao espaço base (ROM com writethrough)
    Passthrough,
}

/// Banco ativo
pub struct Bank {
    start: u16,
    size: usize,
    flags: BankFlags,
    content: BankContent,
}

impl Bank {
    pub(crate) fn new(start: u16, size: usize, flags: BankFlags, content: BankContent) -> Self {
        Self {
            start,
            size,
            flags,
            content,
        }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Primeiro endereço após o banco (pode ser 0x10000)
    pub fn end(&self) -> usize {
        self.start as usize + self.size
    }

    pub fn flags(&self) -> BankFlags {
        self.flags
    }

    pub fn bank_type(&self) -> BankType {
        match self.content {
            BankContent::Rom(_) => BankType::Rom,
            BankContent::Ram(_) => BankType::Ram,
            BankContent::Dynamic { .. } => BankType::Dynamic,
        }
    }

    pub fn is_writethrough(&self) -> bool {
        self.flags.contains(BankFlags::WRITETHROUGH)
    }

    /// Conteúdo armazenado (ROM ou RAM); bancos dinâmicos não têm
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.content {
            BankContent::Rom(data) | BankContent::Ram(data) => Some(&data[..]),
            BankContent::Dynamic { .. } => None,
        }
    }

    pub fn contains(&self, addr: u16) -> bool {
        let addr = addr as usize;
        addr >= self.start as usize && addr < self.end()
    }

    /// Intervalos semiabertos se intersectam?
    pub fn overlaps(&self, start: u16, size: usize) -> bool {
        let start = start as usize;
        start < self.end() && (self.start as usize) < start + size
    }

    /// Lê um byte; `addr` deve estar coberto pelo banco
    pub(crate) fn read(&self, addr: u16) -> u8 {
        let offset = (addr - self.start) as usize;
        match &self.content {
            BankContent::Rom(data) | BankContent::Ram(data) => data[offset],
            BankContent::Dynamic { read, .. } => read(addr),
        }
    }

    /// Escreve um byte; `addr` deve estar coberto pelo banco
    pub(crate) fn write(&mut self, addr: u16, value: u8) -> BankWrite {
        let offset = (addr - self.start) as usize;
        let writethrough = self.is_writethrough();
        match &mut self.content {
            BankContent::Rom(_) if writethrough => BankWrite::Passthrough,
            BankContent::Rom(_) => BankWrite::Done(WriteStatus::Suppressed),
            BankContent::Ram(data) => {
                data[offset] = value;
                BankWrite::Done(WriteStatus::Written)
            }
            BankContent::Dynamic { write: Some(write), .. } => {
                write(addr, value);
                BankWrite::Done(WriteStatus::Written)
            }
            BankContent::Dynamic { write: None, .. } => BankWrite::Done(WriteStatus::Suppressed),
        }
    }
}

impl fmt::Debug for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bank")
            .field("start", &format_args!("{:#06X}", self.start))
            .field("size", &self.size)
            .field("type", &self.bank_type())
            .field("flags", &self.flags)
            .finish()
    }
}

/// Valida a geometria de um banco: `size >= 1` e `start + size <= 0x10000`
pub(crate) fn check_range(
    start: Option<usize>,
    reported: i128,
    size: usize,
) -> MemoryResult<u16> {
    match start {
        Some(s) if size >= 1 && s < ADDRESS_SPACE_SIZE && s + size <= ADDRESS_SPACE_SIZE => {
            Ok(s as u16)
        }
        _ => Err(MemoryError::RangeInvalid {
            start: reported,
            size,
        }),
    }
}
