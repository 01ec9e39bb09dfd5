//! Espaço de endereçamento plano de 64KB.
//!
//! Acesso a bytes e palavras de 16 bits (com ordem de bytes configurável) e
//! sincronização opcional com um arquivo de imagem. Quando há arquivo, o
//! buffer *inteiro* é regravado a cada escrita bem-sucedida: custo O(N) por
//! escrita em troca de durabilidade imediata. Se a regravação falhar, a
//! escrita é desfeita na memória, que continua igual ao arquivo. O arquivo
//! pertence a uma única instância; acesso concorrente por outro processo não
//! é suportado.

use std::path::{Path, PathBuf};
use log::{info, warn};
use num_traits::ToPrimitive;

use crate::core::memory::store::{load_image, save_image};
use crate::core::memory::{
    check_address, check_byte, check_word, MemoryError, MemoryResult, WriteStatus,
    ADDRESS_SPACE_SIZE,
};

/// Ordem dos bytes em palavras de 16 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Compõe uma palavra a partir dos bytes em `addr` e `addr + 1`
    pub fn compose(self, first: u8, second: u8) -> u16 {
        match self {
            Endianness::Little => u16::from_le_bytes([first, second]),
            Endianness::Big => u16::from_be_bytes([first, second]),
        }
    }

    /// Decompõe uma palavra nos bytes de `addr` e `addr + 1`
    pub fn split(self, value: u16) -> [u8; 2] {
        match self {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        }
    }
}

/// Configuração de construção do espaço de endereçamento
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    pub backing_file: Option<PathBuf>,
    pub endianness: Endianness,
    pub size: Option<usize>,
    pub contents: Option<Vec<u8>>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arquivo de imagem sincronizado a cada escrita
    pub fn backing_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.backing_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Tamanho fora do padrão (1..=64K)
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Conteúdo inicial; deve ter exatamente `size` bytes
    pub fn contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = Some(contents);
        self
    }
}

/// Espaço de endereçamento plano
#[derive(Debug, Clone)]
pub struct AddressSpace {
    data: Vec<u8>,
    endianness: Endianness,
    backing_file: Option<PathBuf>,
}

impl AddressSpace {
    /// Cria 64KB zerados, sem arquivo, little-endian
    pub fn new() -> Self {
        Self {
            data: vec![0; ADDRESS_SPACE_SIZE],
            endianness: Endianness::Little,
            backing_file: None,
        }
    }

    /// Cria o espaço a partir de uma configuração
    pub fn from_config(config: MemoryConfig) -> MemoryResult<Self> {
        let size = config.size.unwrap_or(ADDRESS_SPACE_SIZE);
        if size == 0 || size > ADDRESS_SPACE_SIZE {
            return Err(MemoryError::RangeInvalid { start: 0, size });
        }

        if let Some(contents) = &config.contents {
            if contents.len() != size {
                return Err(MemoryError::SizeMismatch {
                    expected: size,
                    actual: contents.len(),
                });
            }
        }

        let data = match &config.backing_file {
            Some(path) => match load_image(path, size)? {
                Some(image) => {
                    if config.contents.is_some() {
                        warn!(
                            "Conteúdo inicial ignorado: imagem existente em {}",
                            path.display()
                        );
                    }
                    image
                }
                None => {
                    let image = config.contents.unwrap_or_else(|| vec![0; size]);
                    save_image(path, &image)?;
                    info!("Imagem de memória criada: {} ({} bytes)", path.display(), size);
                    image
                }
            },
            None => config.contents.unwrap_or_else(|| vec![0; size]),
        };

        Ok(Self {
            data,
            endianness: config.endianness,
            backing_file: config.backing_file,
        })
    }

    /// Atalho para um espaço de 64KB sincronizado com `path`
    pub fn with_backing_file<P: AsRef<Path>>(
        path: P,
        endianness: Endianness,
    ) -> MemoryResult<Self> {
        Self::from_config(MemoryConfig::new().backing_file(path).endianness(endianness))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.backing_file.as_deref()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Lê um byte
    pub fn peek8<A: ToPrimitive>(&self, addr: A) -> MemoryResult<u8> {
        let addr = check_address(addr, self.size())?;
        Ok(self.data[addr as usize])
    }

    /// Escreve um byte; desfeito se o arquivo não puder ser regravado
    pub fn poke8<A: ToPrimitive, V: ToPrimitive>(
        &mut self,
        addr: A,
        value: V,
    ) -> MemoryResult<WriteStatus> {
        let value = check_byte(value)?;
        let addr = check_address(addr, self.size())? as usize;
        let old = self.data[addr];
        self.data[addr] = value;
        if let Err(e) = self.sync() {
            self.data[addr] = old;
            return Err(e);
        }
        Ok(WriteStatus::Written)
    }

    /// Lê uma palavra (16-bit) de `addr` e `addr + 1`
    pub fn peek16<A: ToPrimitive>(&self, addr: A) -> MemoryResult<u16> {
        let (lo, hi) = self.word_span(addr)?;
        Ok(self.endianness.compose(self.data[lo], self.data[hi]))
    }

    /// Escreve uma palavra em `addr` e `addr + 1`, com uma única regravação
    pub fn poke16<A: ToPrimitive, V: ToPrimitive>(
        &mut self,
        addr: A,
        value: V,
    ) -> MemoryResult<WriteStatus> {
        let value = check_word(value)?;
        let (lo, hi) = self.word_span(addr)?;
        let old = [self.data[lo], self.data[hi]];
        let [first, second] = self.endianness.split(value);
        self.data[lo] = first;
        self.data[hi] = second;
        if let Err(e) = self.sync() {
            self.data[lo] = old[0];
            self.data[hi] = old[1];
            return Err(e);
        }
        Ok(WriteStatus::Written)
    }

    /// Regrava o arquivo de imagem, se houver
    pub fn sync(&self) -> MemoryResult<()> {
        if let Some(path) = &self.backing_file {
            save_image(path, &self.data)?;
        }
        Ok(())
    }

    /// Os dois endereços de uma palavra, ambos validados
    fn word_span<A: ToPrimitive>(&self, addr: A) -> MemoryResult<(usize, usize)> {
        let lo = check_address(addr, self.size())? as usize;
        let hi = check_address(lo + 1, self.size())? as usize;
        Ok((lo, hi))
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}
