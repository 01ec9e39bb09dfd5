//! Memória com bancos - funções PEEK/POKE.
//! Este é o núcleo do sistema de memória, chamado pela CPU: cada acesso
//! vai para o banco ativo que cobre o endereço ou, se não houver, para o
//! espaço de endereçamento base.

use log::{debug, trace};
use num_traits::ToPrimitive;

use crate::core::memory::map::{
    check_range, Bank, BankContent, BankFlags, BankType, BankWrite, ReadHandler, WriteHandler,
};
use crate::core::memory::space::AddressSpace;
use crate::core::memory::store::{load_exact, RomSource};
use crate::core::memory::{
    check_address, check_byte, check_word, reported, MemoryError, MemoryResult, WriteStatus,
    ADDRESS_SPACE_SIZE,
};

/// Interface de acesso à memória usada pelo núcleo da CPU
pub trait MemoryAccess {
    /// Lê um byte (8-bit) do endereço especificado
    fn read_byte(&self, addr: u16) -> MemoryResult<u8>;

    /// Escreve um byte no endereço especificado
    fn write_byte(&mut self, addr: u16, value: u8) -> MemoryResult<WriteStatus>;

    /// Lê uma palavra (16-bit) do endereço especificado
    fn read_word(&self, addr: u16) -> MemoryResult<u16>;

    /// Escreve uma palavra no endereço especificado
    fn write_word(&mut self, addr: u16, value: u16) -> MemoryResult<WriteStatus>;
}

/// Memória com bancos sobrepostos.
///
/// Nunca há dois bancos ativos cobrindo o mesmo endereço: um novo banco
/// remove por inteiro todo banco cujo intervalo o intersecte.
#[derive(Debug, Default)]
pub struct BankedMemory {
    space: AddressSpace,
    banks: Vec<Bank>,
}

impl BankedMemory {
    /// Cria a memória sobre um espaço de endereçamento
    pub fn new(space: AddressSpace) -> Self {
        Self {
            space,
            banks: Vec::new(),
        }
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Acesso direto ao espaço base, ignorando os bancos
    pub fn address_space_mut(&mut self) -> &mut AddressSpace {
        &mut self.space
    }

    pub fn into_address_space(self) -> AddressSpace {
        self.space
    }

    /// Bancos ativos, em ordem de inserção
    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.iter()
    }

    /// Banco que cobre `addr`, se houver
    pub fn bank_at(&self, addr: u16) -> Option<&Bank> {
        self.banks.iter().find(|bank| bank.contains(addr))
    }

    /// Ativa um banco ROM ou RAM em `[address, address + size)`.
    ///
    /// ROM exige `source` com exatamente `size` bytes. RAM aceita `source`
    /// opcional para o conteúdo inicial (zerado se ausente). Nada muda se a
    /// validação ou a leitura da fonte falhar.
    pub fn bank<A: ToPrimitive>(
        &mut self,
        address: A,
        size: usize,
        bank_type: BankType,
        source: Option<&mut dyn RomSource>,
        flags: BankFlags,
    ) -> MemoryResult<()> {
        let start = check_range(address.to_usize(), reported(&address), size)?;

        let content = match (bank_type, source) {
            (BankType::Rom, Some(source)) => BankContent::Rom(load_exact(source, size)?.into()),
            (BankType::Rom, None) => return Err(MemoryError::MissingSource),
            (BankType::Ram, Some(source)) => BankContent::Ram(load_exact(source, size)?.into()),
            (BankType::Ram, None) => BankContent::Ram(vec![0; size].into()),
            (BankType::Dynamic, _) => return Err(MemoryError::MissingHandler),
        };

        self.insert(Bank::new(start, size, flags, content));
        Ok(())
    }

    /// Ativa um banco dinâmico: leituras chamam `read`, escritas chamam
    /// `write` (ou são suprimidas se não houver handler de escrita)
    pub fn bank_dynamic<A: ToPrimitive>(
        &mut self,
        address: A,
        size: usize,
        read: ReadHandler,
        write: Option<WriteHandler>,
    ) -> MemoryResult<()> {
        let start = check_range(address.to_usize(), reported(&address), size)?;
        let content = BankContent::Dynamic { read, write };
        self.insert(Bank::new(start, size, BankFlags::empty(), content));
        Ok(())
    }

    /// Desativa o banco que começa exatamente em `address`
    pub fn unbank<A: ToPrimitive>(&mut self, address: A) -> MemoryResult<()> {
        let addr = check_address(address, ADDRESS_SPACE_SIZE)?;
        let pos = self
            .banks
            .iter()
            .position(|bank| bank.start() == addr)
            .ok_or(MemoryError::NoSuchBank(addr))?;
        let bank = self.banks.remove(pos);
        debug!("Banco removido: {:?}", bank);
        Ok(())
    }

    /// Remove todos os bancos
    pub fn unbank_all(&mut self) {
        if !self.banks.is_empty() {
            debug!("Removendo {} bancos", self.banks.len());
        }
        self.banks.clear();
    }

    /// Lê um byte, respeitando os bancos
    pub fn peek<A: ToPrimitive>(&self, addr: A) -> MemoryResult<u8> {
        let addr = check_address(addr, ADDRESS_SPACE_SIZE)?;
        self.read(addr)
    }

    /// Escreve um byte, respeitando os bancos.
    ///
    /// Retorna `Suppressed` para ROM sem writethrough: a escrita é válida
    /// mas não tem efeito.
    pub fn poke<A: ToPrimitive, V: ToPrimitive>(
        &mut self,
        addr: A,
        value: V,
    ) -> MemoryResult<WriteStatus> {
        let value = check_byte(value)?;
        let addr = check_address(addr, ADDRESS_SPACE_SIZE)?;
        self.write(addr, value)
    }

    pub fn peek8<A: ToPrimitive>(&self, addr: A) -> MemoryResult<u8> {
        self.peek(addr)
    }

    pub fn poke8<A: ToPrimitive, V: ToPrimitive>(
        &mut self,
        addr: A,
        value: V,
    ) -> MemoryResult<WriteStatus> {
        self.poke(addr, value)
    }

    /// Lê uma palavra byte a byte pelos bancos, na ordem do espaço base
    pub fn peek16<A: ToPrimitive>(&self, addr: A) -> MemoryResult<u16> {
        let (lo, hi) = word_span(addr)?;
        Ok(self.space.endianness().compose(self.read(lo)?, self.read(hi)?))
    }

    /// Escreve uma palavra byte a byte pelos bancos.
    ///
    /// `Written` só se os dois bytes foram escritos; um byte suprimido não
    /// impede a escrita do outro. Se algum byte cair fora de um espaço base
    /// menor que 64K, nada é escrito.
    pub fn poke16<A: ToPrimitive, V: ToPrimitive>(
        &mut self,
        addr: A,
        value: V,
    ) -> MemoryResult<WriteStatus> {
        let value = check_word(value)?;
        let (lo, hi) = word_span(addr)?;
        self.check_reaches_space(lo)?;
        self.check_reaches_space(hi)?;
        let [first, second] = self.space.endianness().split(value);
        let first = self.write(lo, first)?;
        let second = self.write(hi, second)?;
        if first.is_written() && second.is_written() {
            Ok(WriteStatus::Written)
        } else {
            Ok(WriteStatus::Suppressed)
        }
    }

    /// Escritas em `addr` que vão ao espaço base precisam caber nele
    fn check_reaches_space(&self, addr: u16) -> MemoryResult<()> {
        let to_space = match self.bank_at(addr) {
            Some(bank) => bank.bank_type() == BankType::Rom && bank.is_writethrough(),
            None => true,
        };
        if to_space {
            check_address(addr, self.space.size())?;
        }
        Ok(())
    }

    fn insert(&mut self, bank: Bank) {
        let (start, size) = (bank.start(), bank.size());
        self.banks.retain(|old| {
            let evict = old.overlaps(start, size);
            if evict {
                debug!("Banco removido por sobreposição: {:?}", old);
            }
            !evict
        });
        debug!("Banco ativado: {:?}", bank);
        self.banks.push(bank);
    }

    fn read(&self, addr: u16) -> MemoryResult<u8> {
        match self.bank_at(addr) {
            Some(bank) => Ok(bank.read(addr)),
            None => self.space.peek8(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> MemoryResult<WriteStatus> {
        let bank = match self.banks.iter_mut().find(|bank| bank.contains(addr)) {
            Some(bank) => bank,
            None => return self.space.poke8(addr, value),
        };

        match bank.write(addr, value) {
            BankWrite::Done(WriteStatus::Suppressed) => {
                trace!("Escrita suprimida em {:#06X} (banco {})", addr, bank.bank_type());
                Ok(WriteStatus::Suppressed)
            }
            BankWrite::Done(status) => Ok(status),
            BankWrite::Passthrough => self.space.poke8(addr, value),
        }
    }
}

/// Os dois endereços de uma palavra (sem wraparound em 0xFFFF)
fn word_span<A: ToPrimitive>(addr: A) -> MemoryResult<(u16, u16)> {
    let lo = check_address(addr, ADDRESS_SPACE_SIZE)?;
    let hi = check_address(lo as usize + 1, ADDRESS_SPACE_SIZE)?;
    Ok((lo, hi))
}

impl MemoryAccess for AddressSpace {
    fn read_byte(&self, addr: u16) -> MemoryResult<u8> {
        self.peek8(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> MemoryResult<WriteStatus> {
        self.poke8(addr, value)
    }

    fn read_word(&self, addr: u16) -> MemoryResult<u16> {
        self.peek16(addr)
    }

    fn write_word(&mut self, addr: u16, value: u16) -> MemoryResult<WriteStatus> {
        self.poke16(addr, value)
    }
}

impl MemoryAccess for BankedMemory {
    fn read_byte(&self, addr: u16) -> MemoryResult<u8> {
        self.peek(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> MemoryResult<WriteStatus> {
        self.poke(addr, value)
    }

    fn read_word(&self, addr: u16) -> MemoryResult<u16> {
        self.peek16(addr)
    }

    fn write_word(&mut self, addr: u16, value: u16) -> MemoryResult<WriteStatus> {
        self.poke16(addr, value)
    }
}
