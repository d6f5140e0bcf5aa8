//! Lua sandbox creation
//!
//! Workflow files are evaluated in a restricted Lua state without I/O,
//! OS access or module loading. The `workflow` module is always injected
//! so definitions can use its step helpers.

use mlua::{Function, Lua, LuaOptions, Result as LuaResult, StdLib, Table};

/// Create a restricted Lua sandbox
///
/// Only TABLE, STRING and MATH are loaded. IO, OS, PACKAGE and DEBUG are
/// left out, and the file loading globals are removed.
///
/// # Example
/// ```no_run
/// use hoist_lua::sandbox::create_sandbox;
///
/// let lua = create_sandbox()?;
/// let step: mlua::Table = lua.load(r#"return workflow.build { file = "Containerfile" }"#).eval()?;
/// let uses: String = step.get("uses")?;
/// assert_eq!(uses, "build");
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH,
        LuaOptions::default(),
    )?;

    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    register_workflow_module(&lua)?;

    Ok(lua)
}

/// Register the `workflow` module
///
/// - `workflow.define(def)` returns the definition as-is
/// - `workflow.checkout{}`, `setup_builder{}`, `login{}`, `build{}`,
///   `tag{}`, `push{}` return a step table with `uses` filled in
/// - `workflow.run(command)` returns a shell step
fn register_workflow_module(lua: &Lua) -> LuaResult<()> {
    let workflow = lua.create_table()?;

    let define_fn = lua.create_function(|_, definition: Table| Ok(definition))?;
    workflow.set("define", define_fn)?;

    workflow.set("checkout", step_helper(lua, "checkout")?)?;
    workflow.set("setup_builder", step_helper(lua, "setup-builder")?)?;
    workflow.set("login", step_helper(lua, "registry-login")?)?;
    workflow.set("build", step_helper(lua, "build")?)?;
    workflow.set("tag", step_helper(lua, "tag")?)?;
    workflow.set("push", step_helper(lua, "push")?)?;

    let run_fn = lua.create_function(|lua, (command, options): (String, Option<Table>)| {
        let step = match options {
            Some(table) => table,
            None => lua.create_table()?,
        };
        step.set("run", command)?;
        Ok(step)
    })?;
    workflow.set("run", run_fn)?;

    lua.globals().set("workflow", workflow)?;

    Ok(())
}

/// Builds a helper that stamps `uses` onto an optional options table
fn step_helper(lua: &Lua, uses: &'static str) -> LuaResult<Function> {
    lua.create_function(move |lua, options: Option<Table>| {
        let step = match options {
            Some(table) => table,
            None => lua.create_table()?,
        };
        step.set("uses", uses)?;
        Ok(step)
    })
}
