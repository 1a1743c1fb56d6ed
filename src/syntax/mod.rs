//! The s-expression surface used by tests, documentation and the CLI.
//!
//! The engine itself is agnostic to concrete syntax; this module only exists so
//! trees can be written down and inspected.
//!
//! | Surface           | Node                                   |
//! |-------------------|----------------------------------------|
//! | `foo`, `` `a b` `` | `Id`                                   |
//! | `42` `1.5` `"s"` `'c'` `true` `null` | `Literal`            |
//! | `(f a b)`         | `Call { target: f, args: [a, b] }`     |
//! | `(f)`             | zero-argument call (not the id `f`)    |
//! | `[a b] node`      | `node` with attributes `a`, `b`        |
//! | `$node`           | `($ node)`                             |
//! | `; text`          | comment                                |

pub mod parser;
mod printer;

pub use parser::{parse, parse_one};
