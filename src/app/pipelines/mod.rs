pub mod atterberg_pipeline;
