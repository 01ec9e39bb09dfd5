// Este é o ponto de entrada principal da biblioteca.
// Memória de 64KB com bancos sobrepostos para núcleos de CPUs de 8 bits
// (Z80, 8080, 6502...). A execução de instruções e as portas de I/O
// ficam a cargo do emulador que usa esta memória.

// Módulos principais do projeto.
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::core::memory::{
    AddressSpace, Bank, BankFlags, BankType, BankedMemory, Endianness, FileSource, MemoryAccess,
    MemoryConfig, MemoryError, MemoryResult, ReadHandler, RomSource, StreamSource, WriteHandler,
    WriteStatus, ADDRESS_SPACE_SIZE,
};

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Função conveniente para criar uma memória de 64KB zerada, sem bancos.
pub fn create_memory() -> BankedMemory {
    BankedMemory::new(AddressSpace::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory() {
        let mut mem = create_memory();
        assert_eq!(mem.address_space().size(), ADDRESS_SPACE_SIZE);
        assert_eq!(mem.banks().count(), 0);

        let mut rom: &[u8] = b"This is a ROM";
        mem.bank(0, 13, BankType::Rom, Some(&mut rom), BankFlags::empty()).unwrap();
        assert_eq!(mem.peek(0).unwrap(), b'T');
        assert_eq!(mem.poke(0, 1).unwrap().code(), 0);
        assert!(!VERSION.is_empty());
    }
}
