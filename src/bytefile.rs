//! Loader for Lama VM bytecode images

use std::fmt::Display;
use std::io::{self, BufReader, Cursor, Read};

#[derive(Debug)]
pub enum BytefileError {
    FileError(io::Error),
    MalformedImage(&'static str),
    InvalidStringIndexInStringTable,
}

impl Display for BytefileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BytefileError::FileError(err) => write!(f, "failed to read bytecode file: {}", err),
            BytefileError::MalformedImage(reason) => write!(f, "malformed image: {}", reason),
            BytefileError::InvalidStringIndexInStringTable => {
                write!(f, "invalid string index in string table")
            }
        }
    }
}

impl std::error::Error for BytefileError {}

impl From<io::Error> for BytefileError {
    fn from(err: io::Error) -> Self {
        BytefileError::FileError(err)
    }
}

// Memory layout of the bytecode file
// +------------------------------------+
// |           File Header              |
// |------------------------------------|
// |  int32: stringtab_size | 4 bytes   |
// |  int32: global_size    | 4 bytes   |
// |  int32: public_count   | 4 bytes   |
// |  public_count x (int32, int32)     |
// +------------------------------------+
// |           String Table             |
// |------------------------------------|
// |  stringtab_size bytes, NUL-joined   |
// +------------------------------------+
// |           Code Region              |
// |------------------------------------|
// |  Remainder of the file             |
// +------------------------------------+
pub struct Bytefile {
    stringtab_size: u32,
    pub global_area_size: u32,
    pub public_symbols: Vec<(u32, u32)>,
    string_table: Vec<u8>,
    pub code_section: Vec<u8>,
}

impl Bytefile {
    /// Parse a bytecode file into a Bytefile struct. Validates that the
    /// declared table sizes are consistent with the length of `source`;
    /// deeper validation (e.g. that a string offset actually lands on a
    /// NUL-terminated string) is left to the interpreter at execution time.
    pub fn parse(source: Vec<u8>) -> Result<Bytefile, BytefileError> {
        let source_len = source.len();
        let mut reader = BufReader::new(Cursor::new(source));

        let mut buf = [0u8; 4];
        reader
            .read_exact(&mut buf)
            .map_err(|_| BytefileError::MalformedImage("truncated header: stringtab_size"))?;
        let stringtab_size = u32::from_le_bytes(buf);

        reader
            .read_exact(&mut buf)
            .map_err(|_| BytefileError::MalformedImage("truncated header: global_size"))?;
        let global_area_size = u32::from_le_bytes(buf);

        reader
            .read_exact(&mut buf)
            .map_err(|_| BytefileError::MalformedImage("truncated header: public_count"))?;
        let public_symbols_number = u32::from_le_bytes(buf);

        let header_len = 12u64 + (public_symbols_number as u64) * 8 + stringtab_size as u64;
        if header_len > source_len as u64 {
            return Err(BytefileError::MalformedImage(
                "declared table sizes exceed file length",
            ));
        }

        let mut public_symbols = Vec::with_capacity(public_symbols_number as usize);
        for _ in 0..public_symbols_number {
            reader
                .read_exact(&mut buf)
                .map_err(|_| BytefileError::MalformedImage("truncated publics table"))?;
            let name_offset = u32::from_le_bytes(buf);
            reader
                .read_exact(&mut buf)
                .map_err(|_| BytefileError::MalformedImage("truncated publics table"))?;
            let code_offset = u32::from_le_bytes(buf);
            public_symbols.push((name_offset, code_offset));
        }

        let mut string_table = vec![0u8; stringtab_size as usize];
        reader
            .read_exact(&mut string_table)
            .map_err(|_| BytefileError::MalformedImage("truncated string table"))?;

        let mut code_section = Vec::new();
        reader.read_to_end(&mut code_section)?;

        Ok(Bytefile {
            stringtab_size,
            global_area_size,
            public_symbols,
            string_table,
            code_section,
        })
    }

    /// Read the NUL-terminated string starting at byte offset `offset` in
    /// the string table (the NUL is not included in the returned slice).
    pub fn get_string_at_offset(&self, offset: usize) -> Result<&[u8], BytefileError> {
        #[cfg(feature = "runtime_checks")]
        if offset >= self.string_table.len() {
            return Err(BytefileError::InvalidStringIndexInStringTable);
        }

        let slice = &self.string_table[offset..];
        let end = slice
            .iter()
            .position(|&b| b == 0)
            .ok_or(BytefileError::InvalidStringIndexInStringTable)?;

        Ok(&slice[..end])
    }

    #[cfg(test)]
    pub fn new_dummy() -> Self {
        Bytefile {
            stringtab_size: 0,
            global_area_size: 100,
            public_symbols: vec![],
            code_section: vec![0; 100],
            string_table: vec![],
        }
    }

    /// Append a NUL-terminated string to the string table, returning its offset.
    #[cfg(test)]
    pub fn put_string(&mut self, s: &str) -> u32 {
        let offset = self.string_table.len() as u32;
        self.string_table.extend_from_slice(s.as_bytes());
        self.string_table.push(0);
        self.stringtab_size = self.string_table.len() as u32;
        offset
    }
}

impl Display for Bytefile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--------- Bytefile Header ----------")?;
        writeln!(f, " - String Table Size: {}", self.stringtab_size)?;
        writeln!(f, " - Global Area Size: {}", self.global_area_size)?;
        writeln!(f, " - Public Symbols: {}", self.public_symbols.len())?;
        for (name, ip) in &self.public_symbols {
            writeln!(f, "   - name@{name} -> code@{ip}")?;
        }
        writeln!(f, " - Code Section Size: {} bytes", self.code_section.len())?;
        write!(f, "-------------------------------------")
    }
}
