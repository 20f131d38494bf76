//! A minimal bytecode interpreter for a stack-based virtual machine.
//!
//! This crate loads a single class file (in its own compact binary
//! container, see [`classfile`]) from disk, locates an entry method, and
//! executes a subset of an object-oriented bytecode ISA until that method
//! returns.

pub mod classfile;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod heap;
pub mod interpreter;
pub mod opcode;

use error::ClassFileError;

/// The required name and descriptor of an entry method.
pub const ENTRY_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

/// Locates `class`'s entry point (by default `main([Ljava/lang/String;)V`)
/// and runs it to completion.
///
/// Lookup already requires the exact void-returning [`ENTRY_DESCRIPTOR`] and
/// [`classfile::returns_void`] confirms that shape before dispatch, but a
/// method's declared descriptor is only a claim about its bytecode, not a
/// guarantee: a malformed class file can still execute an `ireturn` inside a
/// method declared `...)V`. A value-bearing entry-method return is a hard
/// error, so the actual return value is also checked after running, not
/// just the descriptor text before running.
pub fn run_entry(
    class: &classfile::ClassFile,
    heap: &mut heap::Heap,
    entry_name: &str,
) -> Result<(), ClassFileError> {
    let method = class
        .find_method(entry_name, ENTRY_DESCRIPTOR)
        .ok_or_else(|| ClassFileError::MethodNotFound {
            name: entry_name.to_string(),
            descriptor: ENTRY_DESCRIPTOR.to_string(),
        })?;

    // `find_method` already pinned the descriptor to `ENTRY_DESCRIPTOR`,
    // which is itself void-returning, but a caller resolving a method some
    // other way (or a future relaxation of that exact-match lookup) could
    // hand `run_entry` a value-bearing descriptor; check its declared shape
    // before ever dispatching into it.
    if !classfile::returns_void(&method.descriptor) {
        return Err(ClassFileError::EntryMustReturnVoid {
            name: entry_name.to_string(),
            descriptor: method.descriptor.clone(),
        });
    }

    match interpreter::invoke(class, heap, method, &[]) {
        None => Ok(()),
        Some(_) => Err(ClassFileError::EntryMustReturnVoid {
            name: entry_name.to_string(),
            descriptor: method.descriptor.clone(),
        }),
    }
}
