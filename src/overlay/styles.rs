//! Stylesheet injected alongside the overlay node.

pub const STYLESHEET_ID: &str = "onboarding-styles";
pub const HIGHLIGHT_CLASS: &str = "onboarding-highlight";
pub const BODY_ACTIVE_CLASS: &str = "onboarding-active";

pub const OVERLAY_CSS: &str = r#"
#onboarding-overlay {
    position: fixed;
    inset: 0;
    background: rgba(0, 0, 0, 0.85);
    display: flex;
    align-items: flex-start;
    justify-content: center;
    z-index: 10000;
    animation: fadeIn 0.3s ease;
    pointer-events: auto;
    overflow-y: auto;
    padding: 2rem 1rem;
}

body.onboarding-active {
    overflow: hidden;
}

body.onboarding-active > *:not(#onboarding-overlay):not(#onboarding-styles) {
    pointer-events: none !important;
}

.onboarding-modal {
    background: white;
    border-radius: 16px;
    padding: 2rem;
    max-width: 500px;
    width: 90%;
    pointer-events: auto;
    max-height: calc(100vh - 4rem);
    overflow-y: auto;
}

.progress-fill {
    height: 100%;
    background: linear-gradient(90deg, #3b82f6, #8b5cf6);
    transition: width 0.3s ease;
}

.onboarding-highlight {
    position: relative;
    z-index: 10001 !important;
    box-shadow: 0 0 0 4px #3b82f6, 0 0 20px rgba(59, 130, 246, 0.5) !important;
    animation: pulse 2s infinite !important;
    border-radius: 8px !important;
    pointer-events: auto !important;
}

@keyframes fadeIn { from { opacity: 0; } to { opacity: 1; } }
@keyframes fadeOut { from { opacity: 1; } to { opacity: 0; } }

@media (max-width: 600px) {
    .onboarding-modal { padding: 1.5rem; margin: 1rem; }
    .onboarding-actions { flex-direction: column; }
}
"#;
