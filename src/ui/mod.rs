//! Interacción con el usuario que no pasa por comandos.

pub mod selection;
