//! The class image data model and its reader.
//!
//! The reader targets this crate's own compact container format rather
//! than a real object-code format: parsing a genuine class-file layout is
//! a separate concern from interpreting bytecode, so this crate invents a
//! simpler binary container and focuses its fidelity on the interpreter.
//! It still reads every multi-byte field with explicit endianness via
//! `byteorder`, because the decoder downstream demands exactly that
//! precision and there is no reason for the reader to be any looser
//! about it.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ClassFileError;

const MAGIC: u32 = 0x4352_5430; // "CRT0"

#[derive(Debug, Clone)]
pub enum ConstantPoolEntry {
    Integer(i32),
    MethodRef(u16),
    Utf8(String),
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub descriptor: String,
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub name: String,
    pub version: (u16, u16),
    /// 0-indexed storage for a wire format that is 1-indexed; see
    /// [`ClassFile::constant_integer`] and [`ClassFile::constant_method_ref`].
    pub constant_pool: Vec<ConstantPoolEntry>,
    pub methods: Vec<Method>,
}

impl ClassFile {
    /// Resolves constant-pool entry `index` (1-indexed, as on the wire) to
    /// an integer constant.
    pub fn constant_integer(&self, index: u16) -> Result<i32, ClassFileError> {
        match self.pool_entry(index)? {
            ConstantPoolEntry::Integer(v) => Ok(*v),
            _ => Err(ClassFileError::NotAnInteger(index)),
        }
    }

    /// Resolves constant-pool entry `index` to a method-ref, returning the
    /// referenced method.
    pub fn find_method_from_index(&self, index: u16) -> Result<&Method, ClassFileError> {
        let method_index = match self.pool_entry(index)? {
            ConstantPoolEntry::MethodRef(m) => *m,
            _ => return Err(ClassFileError::NotAMethodRef(index)),
        };
        self.methods
            .get(method_index as usize)
            .ok_or(ClassFileError::MethodIndexOutOfRange(method_index))
    }

    /// Looks up a method by name and descriptor within this class.
    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    fn pool_entry(&self, index: u16) -> Result<&ConstantPoolEntry, ClassFileError> {
        self.constant_pool
            .get(index as usize - 1)
            .ok_or(ClassFileError::PoolIndexOutOfRange(index))
    }
}

/// The number of parameters a method descriptor declares, derived purely
/// from its textual form.
///
/// Descriptors look like `(II)I` or `([Ljava/lang/String;)V`: a
/// parenthesized parameter section followed by a return type. Each
/// parameter is either a primitive letter (`I`, `C`, ...), an array type
/// (a run of `[` followed by one of those), or an object type
/// (`L` up to the next `;`).
pub fn parameter_count(descriptor: &str) -> Result<usize, ClassFileError> {
    let body = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(|| ClassFileError::BadDescriptor(descriptor.to_string()))?;

    let mut count = 0;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue, // array dimension prefix, still the same parameter
            'L' => {
                while chars.next_if(|&ch| ch != ';').is_some() {}
                if chars.next() != Some(';') {
                    return Err(ClassFileError::BadDescriptor(descriptor.to_string()));
                }
                count += 1;
            }
            'I' | 'C' | 'Z' | 'B' | 'S' | 'J' | 'F' | 'D' => count += 1,
            _ => return Err(ClassFileError::BadDescriptor(descriptor.to_string())),
        }
    }
    Ok(count)
}

/// Returns whether a descriptor declares a `void` return type.
pub fn returns_void(descriptor: &str) -> bool {
    descriptor.ends_with(')') == false && descriptor.rsplit(')').next() == Some("V")
}

pub fn read_file(path: &Path) -> Result<ClassFile, ClassFileError> {
    let bytes = std::fs::read(path).map_err(|source| ClassFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read(&bytes)
}

pub fn read(bytes: &[u8]) -> Result<ClassFile, ClassFileError> {
    let mut cursor = Cursor::new(bytes);

    let magic = cursor.read_u32::<BigEndian>()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }

    let major = cursor.read_u16::<BigEndian>()?;
    let minor = cursor.read_u16::<BigEndian>()?;
    let name = read_len16_string(&mut cursor)?;

    let pool_count = cursor.read_u16::<BigEndian>()?;
    let mut constant_pool = Vec::with_capacity(pool_count as usize);
    for index in 0..pool_count {
        let tag = cursor.read_u8()?;
        let entry = match tag {
            1 => ConstantPoolEntry::Integer(cursor.read_i32::<BigEndian>()?),
            2 => ConstantPoolEntry::MethodRef(cursor.read_u16::<BigEndian>()?),
            3 => ConstantPoolEntry::Utf8(read_len16_string(&mut cursor)?),
            other => {
                return Err(ClassFileError::UnknownTag {
                    tag: other,
                    index: index + 1,
                })
            }
        };
        constant_pool.push(entry);
    }

    let methods_count = cursor.read_u16::<BigEndian>()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        let name = read_len16_string(&mut cursor)?;
        let descriptor = read_len16_string(&mut cursor)?;
        let max_stack = cursor.read_u16::<BigEndian>()?;
        let max_locals = cursor.read_u16::<BigEndian>()?;
        let code_length = cursor.read_u32::<BigEndian>()?;
        let mut code = vec![0u8; code_length as usize];
        cursor.read_exact(&mut code)?;
        methods.push(Method {
            name,
            descriptor,
            max_stack,
            max_locals,
            code,
        });
    }

    debug!(class = %name, methods = methods.len(), pool = constant_pool.len(), "class file parsed");

    Ok(ClassFile {
        name,
        version: (major, minor),
        constant_pool,
        methods,
    })
}

fn read_len16_string(cursor: &mut Cursor<&[u8]>) -> Result<String, ClassFileError> {
    let len = cursor.read_u16::<BigEndian>()?;
    let mut buf = vec![0u8; len as usize];
    cursor.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| ClassFileError::InvalidUtf8 { source: e })
}
