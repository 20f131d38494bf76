//! Fluent builders for assembling class images and method bodies, used by
//! the test suite and by `--disassemble`'s demo fixtures.
//!
//! The chained `push`-style API assembles bytecode by hand, instruction
//! by instruction, rather than parsing it from source text.

use byteorder::{BigEndian, WriteBytesExt};

use crate::classfile::{ClassFile, ConstantPoolEntry, Method};

const MAGIC: u32 = 0x4352_5430;

/// Builds a single method's bytecode, one instruction at a time.
#[derive(Debug, Default, Clone)]
pub struct MethodBuilder {
    name: String,
    descriptor: String,
    max_stack: u16,
    max_locals: u16,
    code: Vec<u8>,
}

impl MethodBuilder {
    pub fn new(name: &str, descriptor: &str, max_stack: u16, max_locals: u16) -> Self {
        MethodBuilder {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            max_stack,
            max_locals,
            code: Vec::new(),
        }
    }

    /// The offset the next pushed instruction will land at; useful for
    /// computing branch offsets by hand, relative to the branch opcode's
    /// own address.
    pub fn here(&self) -> i16 {
        self.code.len() as i16
    }

    pub fn op(mut self, opcode: u8) -> Self {
        self.code.push(opcode);
        self
    }

    pub fn op_u8(mut self, opcode: u8, imm: u8) -> Self {
        self.code.push(opcode);
        self.code.push(imm);
        self
    }

    pub fn op_i8(mut self, opcode: u8, imm: i8) -> Self {
        self.code.push(opcode);
        self.code.push(imm as u8);
        self
    }

    pub fn op_u16(mut self, opcode: u8, imm: u16) -> Self {
        self.code.push(opcode);
        self.code.write_u16::<BigEndian>(imm).unwrap();
        self
    }

    pub fn op_i16(mut self, opcode: u8, imm: i16) -> Self {
        self.code.push(opcode);
        self.code.write_i16::<BigEndian>(imm).unwrap();
        self
    }

    pub fn finish(self) -> Method {
        Method {
            name: self.name,
            descriptor: self.descriptor,
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code: self.code,
        }
    }
}

/// Builds a whole [`ClassFile`], either directly in memory (for unit
/// tests that exercise the interpreter without touching disk) or
/// serialized to this crate's binary container (for tests and demos that
/// exercise [`crate::classfile::read`] end to end).
#[derive(Debug, Default)]
pub struct ClassFileBuilder {
    name: String,
    constant_pool: Vec<ConstantPoolEntry>,
    methods: Vec<Method>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        ClassFileBuilder {
            name: name.to_string(),
            constant_pool: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Adds an integer constant and returns its 1-indexed wire position.
    pub fn add_integer_constant(&mut self, value: i32) -> u16 {
        self.constant_pool.push(ConstantPoolEntry::Integer(value));
        self.constant_pool.len() as u16
    }

    /// Adds a method-ref pointing at `method_index` (0-based, the index
    /// the referenced method will have in [`ClassFile::methods`]) and
    /// returns its 1-indexed wire position.
    pub fn add_method_ref(&mut self, method_index: u16) -> u16 {
        self.constant_pool
            .push(ConstantPoolEntry::MethodRef(method_index));
        self.constant_pool.len() as u16
    }

    /// Appends a method built from a [`MethodBuilder`] and returns its
    /// 0-based index.
    pub fn add_built_method(&mut self, method: Method) -> u16 {
        self.methods.push(method);
        (self.methods.len() - 1) as u16
    }

    /// Overwrites a previously added method in place, keeping its index
    /// stable. Used to assemble a self-recursive method: a placeholder is
    /// added first so a method-ref to it can be taken, then the real body
    /// (which embeds that same ref) replaces the placeholder.
    pub fn replace_method(&mut self, index: u16, method: Method) {
        self.methods[index as usize] = method;
    }

    pub fn add_method(
        &mut self,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: Vec<u8>,
    ) -> u16 {
        self.methods.push(Method {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            max_stack,
            max_locals,
            code,
        });
        (self.methods.len() - 1) as u16
    }

    pub fn finish(self) -> ClassFile {
        ClassFile {
            name: self.name,
            version: (0, 1),
            constant_pool: self.constant_pool,
            methods: self.methods,
        }
    }

    /// Serializes this class image to this crate's binary container
    /// format, suitable for writing to disk and reading back with
    /// [`crate::classfile::read_file`].
    pub fn finish_bytes(self) -> Vec<u8> {
        let class = self.finish();
        let mut out = Vec::new();
        out.write_u32::<BigEndian>(MAGIC).unwrap();
        out.write_u16::<BigEndian>(class.version.0).unwrap();
        out.write_u16::<BigEndian>(class.version.1).unwrap();
        write_len16_string(&mut out, &class.name);

        out.write_u16::<BigEndian>(class.constant_pool.len() as u16)
            .unwrap();
        for entry in &class.constant_pool {
            match entry {
                ConstantPoolEntry::Integer(v) => {
                    out.push(1);
                    out.write_i32::<BigEndian>(*v).unwrap();
                }
                ConstantPoolEntry::MethodRef(m) => {
                    out.push(2);
                    out.write_u16::<BigEndian>(*m).unwrap();
                }
                ConstantPoolEntry::Utf8(s) => {
                    out.push(3);
                    write_len16_string(&mut out, s);
                }
            }
        }

        out.write_u16::<BigEndian>(class.methods.len() as u16)
            .unwrap();
        for method in &class.methods {
            write_len16_string(&mut out, &method.name);
            write_len16_string(&mut out, &method.descriptor);
            out.write_u16::<BigEndian>(method.max_stack).unwrap();
            out.write_u16::<BigEndian>(method.max_locals).unwrap();
            out.write_u32::<BigEndian>(method.code.len() as u32)
                .unwrap();
            out.extend_from_slice(&method.code);
        }

        out
    }
}

fn write_len16_string(out: &mut Vec<u8>, s: &str) {
    out.write_u16::<BigEndian>(s.len() as u16).unwrap();
    out.extend_from_slice(s.as_bytes());
}
