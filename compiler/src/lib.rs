// smlc — SpineML model compiler
//
// Library root. Markup reading, hybrid-automaton translation and the network
// driver.

pub mod cache;
pub mod codegen;
pub mod component;
pub mod diag;
pub mod doc;
pub mod handler;
pub mod id;
pub mod lexer;
pub mod network;
pub mod neuron;
pub mod observe;
pub mod parser;
pub mod pipeline;
pub mod postsynaptic;
pub mod source;
pub mod subst;
pub mod values;
pub mod weight_update;
