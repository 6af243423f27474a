//! Native functions pre-registered in the global environment.
//!
//! Bodies are thin I/O shims; the interesting part is the registration
//! contract (name, arity, invocation through a plain function pointer).

use std::cell::RefCell;
use std::io::{self, Read};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::environment::Environment;
use crate::value::Value;

pub fn install(globals: &Rc<RefCell<Environment>>) {
    info!("Registering native functions");

    let mut globals = globals.borrow_mut();

    globals.define(
        "__SysClockSeconds",
        Value::NativeFunction {
            name: "__SysClockSeconds".to_string(),
            arity: 0,
            func: clock_native,
        },
    );

    globals.define(
        "readline",
        Value::NativeFunction {
            name: "readline".to_string(),
            arity: 0,
            func: readline_native,
        },
    );

    globals.define(
        "readchar",
        Value::NativeFunction {
            name: "readchar".to_string(),
            arity: 0,
            func: readchar_native,
        },
    );
}

/// Wall-clock time as fractional seconds since the Unix epoch.
fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

/// One line from stdin without its trailing newline; `null` on EOF.
fn readline_native(_args: &[Value]) -> Result<Value, String> {
    let mut line = String::new();

    match io::stdin().read_line(&mut line) {
        Ok(0) => Ok(Value::Nil),

        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }

            Ok(Value::String(line))
        }

        Err(e) => Err(format!("readline: {}", e)),
    }
}

/// One byte from stdin as a single-character string; `null` on EOF.
fn readchar_native(_args: &[Value]) -> Result<Value, String> {
    let mut buf = [0u8; 1];

    match io::stdin().read(&mut buf) {
        Ok(0) => Ok(Value::Nil),

        Ok(_) => Ok(Value::String((buf[0] as char).to_string())),

        Err(e) => Err(format!("readchar: {}", e)),
    }
}
