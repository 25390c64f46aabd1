//! CLI 格式化输出
//!
//! 提供命令行友好的结果与错误显示。

use dualclass_api::{DualclassError, EvaluateOutput};

/// 打印错误；`json` 为 true 时输出结构化报告
pub fn print_error(e: &DualclassError, json: bool) {
    let report = e.to_report();
    if json {
        match report.to_json() {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("{report}"),
        }
    } else {
        eprintln!("❌ {report}");
    }
}

/// 打印求值结果与镜像句柄
pub fn print_output(output: &EvaluateOutput, show_steps: bool) {
    if !show_steps {
        println!("{}", output.magnitude);
        return;
    }

    println!("Class: {} (source id {})", output.class, output.source_id);
    println!("Magnitude: {}", output.magnitude);
    println!("[Device Mirrors]");
    for mirror in &output.mirrors {
        match mirror.address {
            Some(addr) => println!("  {:<16} {} = {:#x}", mirror.class, mirror.symbol, addr),
            None => println!("  {:<16} {} = (not mirrored)", mirror.class, mirror.symbol),
        }
    }
}
