//! Cache command implementation.

use kiln_cache::{CacheStats, TransformCache};
use kiln_transform::{CSS_CACHE_NAME, CssOutput, JS_CACHE_NAME, JsOutput};

use crate::cli::{CacheAction, CacheArgs};
use crate::config::KilnConfig;
use crate::error::Result;
use crate::ui;

/// Execute `kiln cache stats` or `kiln cache clear`.
pub fn execute(args: CacheArgs) -> Result<()> {
    let config = KilnConfig::load(args.action.config())?;
    let css: TransformCache<CssOutput> = TransformCache::open(&config.cache_dir, CSS_CACHE_NAME)?;
    let js: TransformCache<JsOutput> = TransformCache::open(&config.cache_dir, JS_CACHE_NAME)?;

    match args.action {
        CacheAction::Stats(_) => {
            println!("Cache directory: {}", config.cache_dir.display());
            print_stats(&css.stats());
            print_stats(&js.stats());
        }
        CacheAction::Clear(_) => {
            let removed = css.clear()? + js.clear()?;
            ui::success(&format!(
                "Removed {} cache entries from {}",
                removed,
                config.cache_dir.display()
            ));
        }
    }
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("  {}: {} entries", stats.name, stats.on_disk);
}
