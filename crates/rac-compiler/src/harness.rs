//! Harness source placed in the throwaway class's main slot.
//!
//! The harness implements `if_oo_adt_classrun` and hands the output
//! channel straight to the caller's `MAIN` class:
//!
//! ```abap
//! new main( )->run( out ).
//! ```
//!
//! User code therefore has to define a local class `MAIN` with a public
//! instance method `RUN` importing exactly one parameter of type
//! `REF TO IF_OO_ADT_CLASSRUN_OUT`.

/// Render the harness for the given class name.
#[must_use]
pub fn render(class_name: &str) -> String {
    format!(
        "class {name} definition public create public final.
  public section.
    interfaces if_oo_adt_classrun.
endclass.

class {name} implementation.
  method if_oo_adt_classrun~main.
    new main( )->run( out ).
  endmethod.
endclass.
",
        name = class_name
    )
}

/// Object description the server attaches to diagnostics raised inside
/// the harness's `main` method.
#[must_use]
pub fn harness_method_tag(class_name: &str) -> String {
    format!("Class {}, Method IF_OO_ADT_CLASSRUN~MAIN", class_name)
}
