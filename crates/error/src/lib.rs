// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error-chaining contract shared by every scriptbridge crate.
//!
//! Each crate (`scriptbridge-engine`, `scriptbridge-runtime`,
//! `scriptbridge-worker`) defines its own `snafu` error enum and implements
//! [`StackError`] for it so that a caller can walk a chain of errors that
//! crosses crate boundaries (a `WorkerError` wrapping a `RuntimeError`
//! wrapping a `ScriptError`) without downcasting.

use std::error::Error as StdError;

/// A link in a cross-crate error chain.
pub trait StackError: StdError {
    /// The next error down the chain, if this error wraps another one
    /// produced by a scriptbridge crate.
    fn next(&self) -> Option<&dyn StackError>;

    /// The innermost error in the chain.
    fn root_cause(&self) -> &dyn StackError
    where
        Self: Sized,
    {
        let Some(mut cur) = self.next() else {
            return self;
        };
        while let Some(next) = cur.next() {
            cur = next;
        }
        cur
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::StackError;

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "leaf") }
    }

    impl StdError for Leaf {}

    impl StackError for Leaf {
        fn next(&self) -> Option<&dyn StackError> { None }
    }

    use std::error::Error as StdError;

    #[derive(Debug)]
    struct Wrapper(Leaf);

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "wrapper") }
    }

    impl StdError for Wrapper {}

    impl StackError for Wrapper {
        fn next(&self) -> Option<&dyn StackError> { Some(&self.0) }
    }

    #[test]
    fn root_cause_walks_the_chain() {
        let wrapper = Wrapper(Leaf);
        assert_eq!(wrapper.root_cause().to_string(), "leaf");
    }
}
