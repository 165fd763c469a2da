use rag_client::Reporter;

/// Prints run output the way the service's own test client does.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn progress(&mut self, message: &str) {
        println!("🔍 {}", message);
    }

    fn success(&mut self, message: &str) {
        println!("✅ {}", message);
    }

    fn failure(&mut self, message: &str) {
        eprintln!("❌ {}", message);
    }

    fn block(&mut self, heading: &str, body: &str) {
        println!("\n📋 {}:", heading);
        println!("{}", body.trim_end());
        println!();
    }
}
