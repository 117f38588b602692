//! JVM Assembly Code Generation
//!
//! This module lowers the typed AST to Krakatau-style textual assembly
//! (`.j` files). Emission is split into focused submodules:
//!
//! - `state.rs`: the `CodeGen` struct, label allocation, operand stack
//!   accounting, descriptor helpers
//! - `program.rs`: class header, static fields, method framing, the
//!   synthetic `main` wrapper, `<init>`, and `<clinit>`
//! - `statements.rs`: statement dispatch, dead-code skipping after
//!   `return`, declaration initializers
//! - `control_flow.rs`: if/while/do/for lowering and the loop label stack
//! - `expressions.rs`: expression lowering, short-circuit logic,
//!   comparisons, casts, calls into the runtime class
//! - `error.rs`: error types
//!
//! # Operand stack accounting
//!
//! Every expression helper records its pushes and pops against a virtual
//! depth counter; the per-method maximum becomes the `.code stack`
//! directive (floored at 2). The net depth across a method body is zero.
//!
//! # Calling the runtime
//!
//! Preloaded I/O functions resolve to static methods of the configured
//! runtime class (`lib440`); string literals lower to `ldc` followed by
//! `java2c`, which converts the constant to the `[C` the runtime works
//! with. User functions become static methods of the emitted class.

mod control_flow;
mod error;
mod expressions;
mod program;
mod state;
mod statements;

pub use error::CodeGenError;
pub use state::CodeGen;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::lexer::{Lexer, TokenStream};
    use crate::parser::Parser;

    fn assemble(source: &str) -> String {
        let config = CompilerConfig::default();
        let stream = TokenStream::new(Lexer::from_source("test.c", source));
        let program = Parser::new(stream, &config).parse().unwrap();
        let mut codegen = CodeGen::new(&program.symbols, &config, "test", "test.c");
        codegen.generate(&program).unwrap()
    }

    fn assemble_err(source: &str) -> CodeGenError {
        let config = CompilerConfig::default();
        let stream = TokenStream::new(Lexer::from_source("test.c", source));
        let program = Parser::new(stream, &config).parse().unwrap();
        let mut codegen = CodeGen::new(&program.symbols, &config, "test", "test.c");
        match codegen.generate(&program) {
            Ok(_) => panic!("expected code generation failure"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_hello_world() {
        let asm = assemble("int main() { putstring(\"hi\\n\"); return 0; }\n");
        assert!(asm.contains(".class public test"), "{}", asm);
        assert!(asm.contains(".super java/lang/Object"), "{}", asm);
        assert!(asm.contains(".method public static main : ()I"), "{}", asm);
        assert!(asm.contains("ldc \"hi\\n\""), "{}", asm);
        assert!(
            asm.contains("invokestatic Method lib440 java2c (Ljava/lang/String;)[C"),
            "{}",
            asm
        );
        assert!(
            asm.contains("invokestatic Method lib440 putstring ([C)V"),
            "{}",
            asm
        );
        assert!(asm.contains("iconst_0"), "{}", asm);
        assert!(asm.contains("ireturn"), "{}", asm);
    }

    #[test]
    fn test_main_wrapper_and_constructor() {
        let asm = assemble("int main() { return 0; }\n");
        assert!(
            asm.contains(".method public static main : ([Ljava/lang/String;)V"),
            "{}",
            asm
        );
        assert!(asm.contains("invokestatic Method test main ()I"), "{}", asm);
        assert!(
            asm.contains("invokestatic Method java/lang/System exit (I)V"),
            "{}",
            asm
        );
        assert!(asm.contains(".method <init> : ()V"), "{}", asm);
        assert!(
            asm.contains("invokespecial Method java/lang/Object <init> ()V"),
            "{}",
            asm
        );
    }

    #[test]
    fn test_widening_emits_i2f() {
        let asm = assemble("int main() { float x; int y; y = 1; x = y + 1; return 0; }\n");
        assert!(asm.contains("i2f"), "{}", asm);
        assert!(asm.contains("fadd"), "{}", asm);
        assert!(asm.contains("fstore 0 ; x"), "{}", asm);
    }

    #[test]
    fn test_local_slots_in_emitted_code() {
        let asm = assemble("int f(int a, int b) { int c; c = a + b; return c; }\nint main() { return f(1, 2); }\n");
        assert!(asm.contains("iload 0 ; a"), "{}", asm);
        assert!(asm.contains("iload 1 ; b"), "{}", asm);
        assert!(asm.contains("istore 2 ; c"), "{}", asm);
        assert!(asm.contains(".method public static f : (II)I"), "{}", asm);
        assert!(asm.contains("invokestatic Method test f (II)I"), "{}", asm);
    }

    #[test]
    fn test_for_loop_with_break() {
        let asm = assemble(
            "int main() { int i; for (i = 0; i < 10; i = i + 1) { if (i == 5) break; putint(i); } return 0; }\n",
        );
        assert!(asm.contains("if_icmplt"), "{}", asm);
        assert!(asm.contains("if_icmpeq"), "{}", asm);
        assert!(
            asm.contains("invokestatic Method lib440 putint (I)V"),
            "{}",
            asm
        );
        // The break jumps forward to the loop end label.
        assert!(asm.contains("goto"), "{}", asm);
    }

    #[test]
    fn test_short_circuit_and() {
        let asm = assemble("int main() { int a; int b; a = 0; b = a && (1 / a); return b; }\n");
        let dup_pos = asm.find("dup").expect("dup for short circuit");
        let div_pos = asm.find("idiv").expect("right operand division");
        assert!(dup_pos < div_pos, "{}", asm);
        assert!(asm.contains("ifeq"), "{}", asm);
    }

    #[test]
    fn test_stack_floor_is_two() {
        let asm = assemble("void f() { return; }\nint main() { f(); return 0; }\n");
        assert!(asm.contains(".method public static f : ()V"), "{}", asm);
        assert!(asm.contains(".code stack 2 locals 0"), "{}", asm);
    }

    #[test]
    fn test_globals_become_static_fields() {
        let asm = assemble("int g;\nfloat h;\nint main() { g = 1; return g; }\n");
        assert!(asm.contains(".field public static g I"), "{}", asm);
        assert!(asm.contains(".field public static h F"), "{}", asm);
        assert!(asm.contains("putstatic Field test g I"), "{}", asm);
        assert!(asm.contains("getstatic Field test g I"), "{}", asm);
    }

    #[test]
    fn test_clinit_only_with_global_initializers() {
        let without = assemble("int g;\nint main() { return 0; }\n");
        assert!(!without.contains("<clinit>"), "{}", without);

        let with = assemble("int g = 41;\nint main() { return g; }\n");
        assert!(with.contains(".method <clinit> : ()V"), "{}", with);
        assert!(with.contains("putstatic Field test g I"), "{}", with);
    }

    #[test]
    fn test_char_literal_lowering() {
        let asm = assemble("int main() { char c; c = 'a'; putchar(c); return 0; }\n");
        assert!(asm.contains("bipush 97"), "{}", asm);
        // putchar returns int; in statement position the result is popped.
        assert!(asm.contains("invokestatic Method lib440 putchar (I)I"), "{}", asm);
        assert!(asm.contains("    pop"), "{}", asm);
    }

    #[test]
    fn test_array_element_assignment() {
        let asm = assemble("int main() { int a[10]; a[0] = 7; return a[0]; }\n");
        assert!(asm.contains("iastore"), "{}", asm);
        assert!(asm.contains("iaload"), "{}", asm);
        assert!(asm.contains("aload 0 ; a"), "{}", asm);
    }

    #[test]
    fn test_while_and_do_while_shapes() {
        let asm = assemble(
            "int main() { int i; i = 0; while (i < 3) { i = i + 1; } do { i = i - 1; } while (i > 0); return i; }\n",
        );
        assert!(asm.contains("ifeq"), "{}", asm);
        assert!(asm.contains("ifne"), "{}", asm);
    }

    #[test]
    fn test_dead_code_after_return_is_skipped() {
        let asm = assemble("int main() { return 0; putint(1); }\n");
        assert!(!asm.contains("putint"), "{}", asm);
    }

    #[test]
    fn test_prefix_increment_uses_iinc() {
        let asm = assemble("int main() { int i; i = 0; ++i; return i; }\n");
        assert!(asm.contains("iinc 0 1 ; i"), "{}", asm);
    }

    #[test]
    fn test_float_comparison_uses_fcmpl() {
        let asm = assemble("int main() { float a; a = 1.5; if (a < 2.0) { return 1; } return 0; }\n");
        assert!(asm.contains("fcmpl"), "{}", asm);
        assert!(asm.contains("iflt"), "{}", asm);
    }

    #[test]
    fn test_explicit_cast_emits_conversion() {
        let asm = assemble("int main() { float f; int i; f = 2.5; i = (int)f; return i; }\n");
        assert!(asm.contains("f2i"), "{}", asm);
    }

    #[test]
    fn test_ternary_lowering() {
        let asm = assemble("int main() { int x; x = 1; return x > 0 ? 1 : 0; }\n");
        assert!(asm.contains("ifeq"), "{}", asm);
        assert!(asm.contains("if_icmpgt"), "{}", asm);
    }

    #[test]
    fn test_missing_main_is_an_error() {
        let err = assemble_err("int f() { return 1; }\n");
        assert!(err.to_string().contains("No main function defined"), "{}", err);
    }

    #[test]
    fn test_member_access_unsupported_in_codegen() {
        let err = assemble_err(
            "struct pair { int a; };\nint main() { struct pair p; p.a = 3; return 0; }\n",
        );
        assert!(
            err.to_string().contains("struct member access"),
            "{}",
            err
        );
    }

    #[test]
    fn test_bare_assignment_statement_leaves_nothing() {
        let asm = assemble("int main() { int x; x = 1; return 0; }\n");
        // In statement position the assignment stores without a dup.
        let body = asm
            .split(".method public static main : ()I")
            .nth(1)
            .unwrap()
            .split(".end method")
            .next()
            .unwrap();
        assert!(!body.contains("dup"), "{}", body);
        assert!(body.contains("istore 0 ; x"), "{}", body);
    }

    #[test]
    fn test_assignment_as_value_dups() {
        let asm = assemble("int main() { int x; int y; y = (x = 1); return y; }\n");
        assert!(asm.contains("dup"), "{}", asm);
    }

    #[test]
    fn test_negative_constant_uses_ineg() {
        let asm = assemble("int main() { return -1; }\n");
        assert!(asm.contains("iconst_1"), "{}", asm);
        assert!(asm.contains("ineg"), "{}", asm);
    }

    #[test]
    fn test_bitwise_not() {
        let asm = assemble("int main() { int x; x = 5; return ~x; }\n");
        assert!(asm.contains("iconst_m1"), "{}", asm);
        assert!(asm.contains("ixor"), "{}", asm);
    }

    #[test]
    fn test_hex_literal_value() {
        let asm = assemble("int main() { return 0x10; }\n");
        assert!(asm.contains("bipush 16"), "{}", asm);
    }

    #[test]
    fn test_string_global_initializer() {
        let asm = assemble("char s[6] = \"hello\";\nint main() { putstring(s); return 0; }\n");
        assert!(asm.contains(".field public static s [C"), "{}", asm);
        assert!(asm.contains(".method <clinit> : ()V"), "{}", asm);
        assert!(asm.contains("putstatic Field test s [C"), "{}", asm);
        assert!(asm.contains("getstatic Field test s [C"), "{}", asm);
    }
}
