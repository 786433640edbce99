use tracing::info;

const BAR_WIDTH: usize = 24;

/// 控制台步骤进度（通过日志输出）
pub struct ProgressReporter {
    total_steps: usize,
    current_step: usize,
}

impl ProgressReporter {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            current_step: 0,
        }
    }

    pub fn start(&self, message: &str) {
        info!("{}", message);
        if let Some(bar) = self.render_bar() {
            info!("{}", bar);
        }
    }

    pub fn advance(&mut self, label: &str) {
        if self.total_steps == 0 {
            info!("{}", label);
            return;
        }
        self.current_step = (self.current_step + 1).min(self.total_steps);
        info!("[{}/{}] {}", self.current_step, self.total_steps, label);
        if let Some(bar) = self.render_bar() {
            info!("{}", bar);
        }
    }

    fn render_bar(&self) -> Option<String> {
        if self.total_steps == 0 {
            return None;
        }
        let ratio = self.current_step as f64 / self.total_steps as f64;
        let filled = ((ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        Some(format!(
            "[{}{}] {:5.1}%",
            "█".repeat(filled),
            "░".repeat(BAR_WIDTH - filled),
            ratio * 100.0
        ))
    }
}
