//! Persistência de imagens de memória.
//! Carrega/salva o buffer completo do espaço de endereçamento e lê imagens
//! de ROM de arquivos, streams ou buffers em memória.
//!
//! Nenhum descritor fica aberto entre chamadas: cada função abre, usa e
//! fecha o arquivo dentro da própria chamada.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use log::{debug, info};

use crate::core::memory::{MemoryError, MemoryResult};

/// Fonte de bytes para o conteúdo de um banco.
///
/// `read_bytes` devolve os bytes destinados a um banco de `len` bytes; a
/// verificação de tamanho fica em [`load_exact`]. Imagens completas
/// (arquivo, buffer) devolvem o conteúdo inteiro, para que um tamanho
/// diferente seja detectado. Streams leem no máximo `len` bytes e ficam
/// posicionados logo depois deles.
pub trait RomSource {
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

/// Imagem de ROM lida de um arquivo (aberto a cada leitura)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RomSource for FileSource {
    fn read_bytes(&mut self, _len: usize) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// Imagem de ROM lida de qualquer `Read` (cursor, pipe, socket...)
pub struct StreamSource<R> {
    reader: R,
}

impl<R: Read> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> RomSource for StreamSource<R> {
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(len);
        self.reader.by_ref().take(len as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

impl RomSource for &[u8] {
    fn read_bytes(&mut self, _len: usize) -> io::Result<Vec<u8>> {
        let data = self.to_vec();
        *self = &[];
        Ok(data)
    }
}

/// Lê `len` bytes da fonte e exige exatamente esse tamanho
pub fn load_exact(source: &mut dyn RomSource, len: usize) -> MemoryResult<Vec<u8>> {
    let data = source.read_bytes(len)?;
    if data.len() != len {
        return Err(MemoryError::SizeMismatch {
            expected: len,
            actual: data.len(),
        });
    }
    Ok(data)
}

/// Carrega uma imagem de memória se o arquivo existir.
///
/// Retorna `Ok(None)` quando o arquivo não existe; um tamanho diferente de
/// `len` é fatal.
pub fn load_image<P: AsRef<Path>>(path: P, len: usize) -> MemoryResult<Option<Vec<u8>>> {
    let path = path.as_ref();
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if data.len() != len {
        return Err(MemoryError::SizeMismatch {
            expected: len,
            actual: data.len(),
        });
    }

    info!("Imagem de memória carregada: {} ({} bytes)", path.display(), len);
    Ok(Some(data))
}

/// Reescreve a imagem completa no arquivo
pub fn save_image<P: AsRef<Path>>(path: P, data: &[u8]) -> MemoryResult<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    debug!("Imagem de memória salva: {} ({} bytes)", path.display(), data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_slice_source() {
        let rom = b"This is a ROM";
        let mut source: &[u8] = rom;
        assert_eq!(load_exact(&mut source, 13).unwrap(), rom.to_vec());

        let mut source: &[u8] = rom;
        assert!(matches!(
            load_exact(&mut source, 12),
            Err(MemoryError::SizeMismatch { expected: 12, actual: 13 })
        ));
    }

    #[test]
    fn test_stream_source() {
        let mut source = StreamSource::new(Cursor::new(vec![1u8, 2, 3, 4]));
        assert_eq!(load_exact(&mut source, 4).unwrap(), vec![1, 2, 3, 4]);

        // Stream já consumido
        assert!(matches!(
            load_exact(&mut source, 4),
            Err(MemoryError::SizeMismatch { expected: 4, actual: 0 })
        ));
    }

    #[test]
    fn test_stream_source_reads_only_len_bytes() {
        let mut source = StreamSource::new(Cursor::new(b"This is a ROMSecond page!!".to_vec()));
        assert_eq!(load_exact(&mut source, 13).unwrap(), b"This is a ROM".to_vec());
        assert_eq!(load_exact(&mut source, 13).unwrap(), b"Second page!!".to_vec());

        // Stream curto: o que restar é menor que o banco
        let mut source = StreamSource::new(Cursor::new(vec![1u8, 2, 3]));
        assert!(matches!(
            load_exact(&mut source, 4),
            Err(MemoryError::SizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_endless_stream_source() {
        // io::repeat nunca termina; só `len` bytes são consumidos
        let mut source = StreamSource::new(io::repeat(0xAA));
        assert_eq!(load_exact(&mut source, 8).unwrap(), vec![0xAA; 8]);
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rom.bin");
        fs::write(&path, b"This is a ROM").unwrap();

        let mut source = FileSource::new(&path);
        assert_eq!(source.path(), path.as_path());
        assert_eq!(load_exact(&mut source, 13).unwrap(), b"This is a ROM".to_vec());
        // Arquivo é reaberto a cada leitura
        assert_eq!(load_exact(&mut source, 13).unwrap().len(), 13);
    }

    #[test]
    fn test_missing_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileSource::new(dir.path().join("missing.bin"));
        assert!(matches!(
            load_exact(&mut source, 13),
            Err(MemoryError::BackingStoreIo(_))
        ));
    }

    #[test]
    fn test_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ram.bin");

        assert!(load_image(&path, 16).unwrap().is_none());

        let data: Vec<u8> = (0..16).collect();
        save_image(&path, &data).unwrap();
        assert_eq!(load_image(&path, 16).unwrap(), Some(data));

        assert!(matches!(
            load_image(&path, 32),
            Err(MemoryError::SizeMismatch { expected: 32, actual: 16 })
        ));
    }
}
