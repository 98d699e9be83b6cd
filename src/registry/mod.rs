// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Member and function registries
//!
//! Both tables are closed and built once per process. The evaluator
//! resolves `.name` through [`MemberRegistry`] and constructor calls through
//! [`FunctionRegistry`].

pub mod functions;
pub mod members;

pub use functions::{FunctionImpl, FunctionRegistry, register_builtin_functions, standard_functions};
pub use members::{MemberGetter, MemberRegistry, register_builtin_members, standard_members};
