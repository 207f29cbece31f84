pub mod bubbles;
