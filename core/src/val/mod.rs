pub mod table;
mod values;

#[cfg(test)]
mod val_test;

pub use table::{TableKey, TableValue};
pub use values::{BoundMethodValue, FunctionValue, NativeFn, Val};
